//! Connection pool construction.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use crate::error::DbError;

/// Wrapper around the platform's `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct DbPool {
    inner: PgPool,
}

impl DbPool {
    /// Connect with default pool settings.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        Self::connect_with(database_url, 10, Duration::from_secs(10)).await
    }

    /// Connect with explicit pool size and acquire timeout.
    pub async fn connect_with(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, DbError> {
        let inner = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(DbError::ConnectionFailed)?;

        Ok(Self { inner })
    }

    /// Wrap an existing pool.
    #[must_use]
    pub fn from_pool(inner: PgPool) -> Self {
        Self { inner }
    }

    /// Access the underlying `SQLx` pool.
    #[must_use]
    pub fn inner(&self) -> &PgPool {
        &self.inner
    }
}
