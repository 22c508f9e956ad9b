//! Error types for sync reconciliation.

use thiserror::Error;
use uuid::Uuid;

use mirador_db::DbError;

/// Pass-level sync errors.
///
/// Failures inside one mapping's reconciliation never surface here; they
/// are captured per mapping in the pass results. This type covers the pass
/// boundary: lock management, connection lookup, and platform storage.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Another pass currently owns the connection. Callers should retry
    /// later; requests are never queued.
    #[error("sync already in progress for connection {connection_id}")]
    AlreadyRunning { connection_id: Uuid },

    /// The connection does not exist.
    #[error("connection not found: {connection_id}")]
    ConnectionNotFound { connection_id: Uuid },

    /// A connector-side failure (connectivity, credentials, fetch).
    #[error("connector error: {message}")]
    Connector { message: String },

    /// Platform storage failed.
    #[error("storage error: {0}")]
    Store(#[from] DbError),
}

impl SyncError {
    /// Whether this should map to an HTTP 409 rather than a failure.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::AlreadyRunning { .. })
    }

    /// Stable code for classification in logs and API payloads.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            SyncError::AlreadyRunning { .. } => "SYNC_IN_PROGRESS",
            SyncError::ConnectionNotFound { .. } => "CONNECTION_NOT_FOUND",
            SyncError::Connector { .. } | SyncError::Store(_) => "SYNC_ERROR",
        }
    }

    /// Wrap a connector-side failure.
    pub fn connector(err: impl std::fmt::Display) -> Self {
        SyncError::Connector {
            message: err.to_string(),
        }
    }
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_classification() {
        let conflict = SyncError::AlreadyRunning {
            connection_id: Uuid::new_v4(),
        };
        assert!(conflict.is_conflict());
        assert_eq!(conflict.error_code(), "SYNC_IN_PROGRESS");

        let missing = SyncError::ConnectionNotFound {
            connection_id: Uuid::new_v4(),
        };
        assert!(!missing.is_conflict());
        assert_eq!(missing.error_code(), "CONNECTION_NOT_FOUND");

        assert_eq!(SyncError::connector("boom").error_code(), "SYNC_ERROR");
    }
}
