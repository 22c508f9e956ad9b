//! Source connection model.
//!
//! One row per tenant-owned external data source. The row carries the
//! connection's sync metadata and the `is_syncing` claim used by the sync
//! reconciler as a single-flight lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use uuid::Uuid;

/// Vendor of an external data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `PostgreSQL` server.
    Postgres,
    /// `MySQL`/MariaDB server.
    Mysql,
    /// Supabase project.
    Supabase,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Postgres => write!(f, "postgres"),
            SourceKind::Mysql => write!(f, "mysql"),
            SourceKind::Supabase => write!(f, "supabase"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SourceKind::Postgres),
            "mysql" => Ok(SourceKind::Mysql),
            "supabase" => Ok(SourceKind::Supabase),
            _ => Err(format!("Unknown source kind: {s}")),
        }
    }
}

/// A connection to an external data source.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SourceConnection {
    /// Unique identifier.
    pub id: Uuid,

    /// Tenant owning this connection.
    pub tenant_id: Uuid,

    /// Display name, unique per tenant.
    pub name: String,

    /// Vendor of the source.
    pub source_kind: SourceKind,

    /// Source host.
    pub host: String,

    /// Source port, when not the vendor default.
    pub port: Option<i32>,

    /// Database name on the source.
    pub database_name: String,

    /// Username for source authentication.
    pub username: String,

    /// AEAD ciphertext of the password.
    #[serde(skip_serializing)]
    pub password_encrypted: Vec<u8>,

    /// Key version used for encryption (rotation support).
    pub credentials_key_version: i32,

    /// Vendor-specific configuration blob. May embed an encrypted service
    /// key and an `ssl` flag.
    pub config: serde_json::Value,

    /// Minutes between automatic syncs; None disables the schedule math.
    pub sync_frequency_minutes: Option<i32>,

    /// Whether the scheduler should pick this connection up.
    pub auto_sync_enabled: bool,

    /// When the last sync pass finished.
    pub last_synced_at: Option<DateTime<Utc>>,

    /// When the next automatic sync is due.
    pub next_sync_at: Option<DateTime<Utc>>,

    /// Single-flight claim: true while a sync pass owns the connection.
    pub is_syncing: bool,

    /// Last connectivity check timestamp.
    pub last_connection_test: Option<DateTime<Utc>>,

    /// Last error from a connectivity check.
    pub last_error: Option<String>,

    /// When the connection was created.
    pub created_at: DateTime<Utc>,

    /// When the connection was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Request to create a new source connection.
///
/// The password must be encrypted before this reaches the model; plaintext
/// credentials never touch storage code.
#[derive(Debug, Clone)]
pub struct CreateSourceConnection {
    pub name: String,
    pub source_kind: SourceKind,
    pub host: String,
    pub port: Option<i32>,
    pub database_name: String,
    pub username: String,
    pub password_encrypted: Vec<u8>,
    pub credentials_key_version: i32,
    pub config: serde_json::Value,
    pub sync_frequency_minutes: Option<i32>,
    pub auto_sync_enabled: bool,
}

impl SourceConnection {
    /// Create a new connection.
    pub async fn create(
        pool: &PgPool,
        tenant_id: Uuid,
        input: &CreateSourceConnection,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO source_connections (
                tenant_id, name, source_kind, host, port, database_name, username,
                password_encrypted, credentials_key_version, config,
                sync_frequency_minutes, auto_sync_enabled
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(&input.name)
        .bind(input.source_kind.to_string())
        .bind(&input.host)
        .bind(input.port)
        .bind(&input.database_name)
        .bind(&input.username)
        .bind(&input.password_encrypted)
        .bind(input.credentials_key_version)
        .bind(&input.config)
        .bind(input.sync_frequency_minutes)
        .bind(input.auto_sync_enabled)
        .fetch_one(pool)
        .await
    }

    /// Find a connection by ID within a tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM source_connections
            WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }

    /// List all connections for a tenant.
    pub async fn list_by_tenant(pool: &PgPool, tenant_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM source_connections
            WHERE tenant_id = $1
            ORDER BY name
            ",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
    }

    /// Atomically claim the connection for a sync pass.
    ///
    /// The claim succeeds only when no other pass holds it; the UPDATE is
    /// the lock acquisition, so two concurrent callers cannot both win.
    pub async fn try_begin_sync(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE source_connections
            SET is_syncing = TRUE, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND NOT is_syncing
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record the end of a completed pass: sync timestamps plus release of
    /// the claim, in one statement.
    pub async fn complete_sync(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        last_synced_at: DateTime<Utc>,
        next_sync_at: Option<DateTime<Utc>>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE source_connections
            SET last_synced_at = $3, next_sync_at = $4, is_syncing = FALSE, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(last_synced_at)
        .bind(next_sync_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Release the claim without touching sync timestamps. Failure path
    /// only; the lock must never stay held after a pass returns.
    pub async fn release_sync(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE source_connections
            SET is_syncing = FALSE, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record the outcome of a connectivity check.
    pub async fn record_connection_test(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
        error: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r"
            UPDATE source_connections
            SET last_connection_test = NOW(), last_error = $3, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(error)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Effective source port (vendor default when unset).
    #[must_use]
    pub fn effective_port(&self) -> u16 {
        match self.port {
            Some(port) => port as u16,
            None => match self.source_kind {
                SourceKind::Postgres | SourceKind::Supabase => 5432,
                SourceKind::Mysql => 3306,
            },
        }
    }

    /// Whether automatic syncing is fully configured.
    #[must_use]
    pub fn auto_sync_configured(&self) -> bool {
        self.auto_sync_enabled && self.sync_frequency_minutes.is_some()
    }
}
