//! Mirrored record model.
//!
//! The local copy of one external row, keyed by (connection, mapping,
//! external id). Rows that disappear from the source flip `is_active` to
//! false and are never deleted, so downstream idempotency keys stay stable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A locally mirrored external row.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MirroredRecord {
    /// Unique identifier.
    pub id: Uuid,

    /// Tenant owning the record.
    pub tenant_id: Uuid,

    /// Connection the row came from.
    pub connection_id: Uuid,

    /// Mapping that produced the canonical payload.
    pub mapping_id: Uuid,

    /// String form of the source row's primary-key value.
    pub external_id: String,

    /// Canonical payload; the raw source row sits under `"_raw"`.
    pub data: serde_json::Value,

    /// Whether the row was present in the most recent completed fetch.
    pub is_active: bool,

    /// When this record was last written by a sync pass.
    pub synced_at: DateTime<Utc>,

    /// When the record was first mirrored.
    pub created_at: DateTime<Utc>,

    /// When the record was last updated.
    pub updated_at: DateTime<Utc>,
}

impl MirroredRecord {
    /// Load every mirrored record for a mapping, active or not.
    pub async fn list_by_mapping(
        pool: &PgPool,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM mirrored_records
            WHERE tenant_id = $1 AND connection_id = $2 AND mapping_id = $3
            ",
        )
        .bind(tenant_id)
        .bind(connection_id)
        .bind(mapping_id)
        .fetch_all(pool)
        .await
    }

    /// Load only the currently active records for a mapping.
    pub async fn list_active_by_mapping(
        pool: &PgPool,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM mirrored_records
            WHERE tenant_id = $1 AND connection_id = $2 AND mapping_id = $3 AND is_active
            ",
        )
        .bind(tenant_id)
        .bind(connection_id)
        .bind(mapping_id)
        .fetch_all(pool)
        .await
    }

    /// Insert a record or overwrite its payload, marking it active either
    /// way.
    #[allow(clippy::too_many_arguments)]
    pub async fn upsert_active(
        pool: &PgPool,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
        external_id: &str,
        data: &serde_json::Value,
        synced_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO mirrored_records
                (tenant_id, connection_id, mapping_id, external_id, data, is_active, synced_at)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            ON CONFLICT (connection_id, mapping_id, external_id)
            DO UPDATE SET
                data = EXCLUDED.data,
                is_active = TRUE,
                synced_at = EXCLUDED.synced_at,
                updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(connection_id)
        .bind(mapping_id)
        .bind(external_id)
        .bind(data)
        .bind(synced_at)
        .fetch_one(pool)
        .await
    }

    /// Flip the given external ids inactive. Returns the number of rows
    /// actually transitioned (already-inactive rows are left alone).
    pub async fn deactivate(
        pool: &PgPool,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
        external_ids: &[String],
        synced_at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        if external_ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r"
            UPDATE mirrored_records
            SET is_active = FALSE, synced_at = $5, updated_at = NOW()
            WHERE tenant_id = $1 AND connection_id = $2 AND mapping_id = $3
              AND external_id = ANY($4)
              AND is_active
            ",
        )
        .bind(tenant_id)
        .bind(connection_id)
        .bind(mapping_id)
        .bind(external_ids)
        .bind(synced_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count all mirrored records for a mapping, active or not.
    pub async fn count_by_mapping(
        pool: &PgPool,
        tenant_id: Uuid,
        connection_id: Uuid,
        mapping_id: Uuid,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            r"
            SELECT COUNT(*) FROM mirrored_records
            WHERE tenant_id = $1 AND connection_id = $2 AND mapping_id = $3
            ",
        )
        .bind(tenant_id)
        .bind(connection_id)
        .bind(mapping_id)
        .fetch_one(pool)
        .await
    }

    /// The raw source row snapshot, when present.
    #[must_use]
    pub fn raw_snapshot(&self) -> Option<&serde_json::Value> {
        self.data.get("_raw")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_snapshot() {
        let record = MirroredRecord {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            connection_id: Uuid::new_v4(),
            mapping_id: Uuid::new_v4(),
            external_id: "42".to_string(),
            data: json!({"status": "won", "_raw": {"id": 42, "stage": "won"}}),
            is_active: true,
            synced_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(record.raw_snapshot(), Some(&json!({"id": 42, "stage": "won"})));
    }
}
