//! Persistence seam for the reconciler.
//!
//! One trait covering everything a pass touches: the connection row (claim,
//! release, sync metadata), the mapping list, and the mirror. The claim
//! methods must be atomic with respect to concurrent passes; the
//! `PostgreSQL` implementation rides on a conditional UPDATE.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use mirador_db::models::{FieldMapping, MirroredRecord, SourceConnection};
use mirador_db::DbError;

/// Storage operations used by a sync pass.
#[async_trait]
pub trait SyncStore: Send + Sync {
    /// Look up a connection within a tenant.
    async fn find_connection(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Option<SourceConnection>, DbError>;

    /// Atomically claim the connection for a pass. Returns false when
    /// another pass already holds the claim.
    async fn try_begin_sync(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<bool, DbError>;

    /// Record the end of a completed pass and release the claim.
    async fn complete_sync(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        last_synced_at: DateTime<Utc>,
        next_sync_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError>;

    /// Release the claim without touching sync metadata (failure path).
    async fn release_sync(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<(), DbError>;

    /// List the connection's mappings.
    async fn list_mappings(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Vec<FieldMapping>, DbError>;

    /// Load every mirrored record for a mapping, active or not.
    async fn load_mirror(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
    ) -> Result<Vec<MirroredRecord>, DbError>;

    /// Insert or overwrite one mirrored record, marking it active.
    #[allow(clippy::too_many_arguments)]
    async fn upsert_record(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
        external_id: &str,
        data: &serde_json::Value,
        synced_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    /// Flip the given external ids inactive; already-inactive rows are
    /// untouched. Returns the number of rows transitioned.
    async fn deactivate_records(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
        external_ids: &[String],
        synced_at: DateTime<Utc>,
    ) -> Result<u64, DbError>;
}

/// `PostgreSQL`-backed store over the platform pool.
#[derive(Debug, Clone)]
pub struct PgSyncStore {
    pool: PgPool,
}

impl PgSyncStore {
    /// Create a store over the given pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncStore for PgSyncStore {
    async fn find_connection(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Option<SourceConnection>, DbError> {
        SourceConnection::find_by_id(&self.pool, tenant_id, connection_id)
            .await
            .map_err(DbError::from)
    }

    async fn try_begin_sync(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<bool, DbError> {
        SourceConnection::try_begin_sync(&self.pool, tenant_id, connection_id)
            .await
            .map_err(DbError::from)
    }

    async fn complete_sync(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        last_synced_at: DateTime<Utc>,
        next_sync_at: Option<DateTime<Utc>>,
    ) -> Result<(), DbError> {
        SourceConnection::complete_sync(
            &self.pool,
            tenant_id,
            connection_id,
            last_synced_at,
            next_sync_at,
        )
        .await?;
        Ok(())
    }

    async fn release_sync(&self, tenant_id: Uuid, connection_id: Uuid) -> Result<(), DbError> {
        SourceConnection::release_sync(&self.pool, tenant_id, connection_id).await?;
        Ok(())
    }

    async fn list_mappings(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Vec<FieldMapping>, DbError> {
        FieldMapping::list_by_connection(&self.pool, tenant_id, connection_id)
            .await
            .map_err(DbError::from)
    }

    async fn load_mirror(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
    ) -> Result<Vec<MirroredRecord>, DbError> {
        MirroredRecord::list_by_mapping(&self.pool, tenant_id, connection_id, mapping_id)
            .await
            .map_err(DbError::from)
    }

    async fn upsert_record(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
        external_id: &str,
        data: &serde_json::Value,
        synced_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        MirroredRecord::upsert_active(
            &self.pool,
            tenant_id,
            connection_id,
            mapping_id,
            external_id,
            data,
            synced_at,
        )
        .await?;
        Ok(())
    }

    async fn deactivate_records(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
        external_ids: &[String],
        synced_at: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        MirroredRecord::deactivate(
            &self.pool,
            tenant_id,
            connection_id,
            mapping_id,
            external_ids,
            synced_at,
        )
        .await
        .map_err(DbError::from)
    }
}
