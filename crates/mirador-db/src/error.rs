//! Error types for the mirador-db crate.

use thiserror::Error;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A query failed to execute.
    #[error("query failed: {0}")]
    QueryFailed(#[source] sqlx::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Validation failed.
    #[error("validation failed: {0}")]
    ValidationFailed(String),
}

impl DbError {
    /// Whether this error indicates a missing row.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }

    /// Whether this error indicates a connection problem.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, DbError::ConnectionFailed(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DbError::ConnectionFailed(err)
            }
            other => DbError::QueryFailed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(DbError::NotFound("mapping".to_string()).is_not_found());
        assert!(!DbError::ValidationFailed("bad".to_string()).is_not_found());
    }

    #[test]
    fn test_from_sqlx_error() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(err.is_connection_error());

        let err: DbError = sqlx::Error::RowNotFound.into();
        assert!(!err.is_connection_error());
    }
}
