//! Mapping validation audit model.
//!
//! Append-only: one row per successful save of a mapping, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// One validation run recorded against a mapping.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MappingValidation {
    /// Unique identifier.
    pub id: Uuid,

    /// Mapping this validation belongs to.
    pub mapping_id: Uuid,

    /// Whether validation passed.
    pub passed: bool,

    /// Number of sampled rows the quality metrics were computed over.
    pub row_count: i64,

    /// Metrics snapshot (quality ratios and warnings).
    pub metrics: serde_json::Value,

    /// When the validation ran.
    pub created_at: DateTime<Utc>,
}

impl MappingValidation {
    /// Append a validation record.
    pub async fn create(
        pool: &PgPool,
        mapping_id: Uuid,
        passed: bool,
        row_count: i64,
        metrics: &serde_json::Value,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO mapping_validations (mapping_id, passed, row_count, metrics)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            ",
        )
        .bind(mapping_id)
        .bind(passed)
        .bind(row_count)
        .bind(metrics)
        .fetch_one(pool)
        .await
    }

    /// List validations for a mapping, newest first.
    pub async fn list_by_mapping(
        pool: &PgPool,
        mapping_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM mapping_validations
            WHERE mapping_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(mapping_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}
