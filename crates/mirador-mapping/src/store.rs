//! Persistence seams for the validator.
//!
//! The validator talks to storage through these traits so its behavior can
//! be exercised without a live database; [`PgCatalogStore`] is the
//! production implementation over the platform pool.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mirador_db::models::{FieldMap, FieldMapping, MappingValidation, SourceConnection};
use mirador_db::DbError;

/// Read access to stored source connections.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// Look up a connection within a tenant.
    async fn find_connection(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Option<SourceConnection>, DbError>;

    /// Record the outcome of a connectivity check (None = success).
    async fn record_connection_test(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        error: Option<&str>,
    ) -> Result<(), DbError>;
}

/// Write access to mappings and their validation audit trail.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Upsert the mapping for (tenant, connection, resource).
    async fn upsert_mapping(
        &self,
        tenant_id: Uuid,
        connection_id: Option<Uuid>,
        resource: &str,
        fields: &FieldMap,
        validated_at: DateTime<Utc>,
    ) -> Result<FieldMapping, DbError>;

    /// Append a validation audit record.
    async fn record_validation(
        &self,
        mapping_id: Uuid,
        passed: bool,
        row_count: i64,
        metrics: &serde_json::Value,
    ) -> Result<(), DbError>;
}

/// `PostgreSQL`-backed store over the platform pool.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Create a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConnectionStore for PgCatalogStore {
    async fn find_connection(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Option<SourceConnection>, DbError> {
        SourceConnection::find_by_id(&self.pool, tenant_id, connection_id)
            .await
            .map_err(DbError::from)
    }

    async fn record_connection_test(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        error: Option<&str>,
    ) -> Result<(), DbError> {
        SourceConnection::record_connection_test(&self.pool, tenant_id, connection_id, error)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl MappingStore for PgCatalogStore {
    async fn upsert_mapping(
        &self,
        tenant_id: Uuid,
        connection_id: Option<Uuid>,
        resource: &str,
        fields: &FieldMap,
        validated_at: DateTime<Utc>,
    ) -> Result<FieldMapping, DbError> {
        FieldMapping::upsert(&self.pool, tenant_id, connection_id, resource, fields, validated_at)
            .await
            .map_err(DbError::from)
    }

    async fn record_validation(
        &self,
        mapping_id: Uuid,
        passed: bool,
        row_count: i64,
        metrics: &serde_json::Value,
    ) -> Result<(), DbError> {
        MappingValidation::create(&self.pool, mapping_id, passed, row_count, metrics).await?;
        Ok(())
    }
}
