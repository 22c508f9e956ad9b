//! Field mapping model.
//!
//! Maps an external resource's columns onto the platform's canonical
//! business fields. One mapping per (tenant, connection, resource); saves
//! are upserts and mappings are never physically deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use std::fmt;
use uuid::Uuid;

/// Primary-key column assumed when a mapping does not configure one.
pub const DEFAULT_PK_COLUMN: &str = "id";

/// The platform's canonical field slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalField {
    Status,
    Date,
    Contact,
    Pk,
    LastTouch,
}

impl CanonicalField {
    /// The three fields a mapping must populate.
    #[must_use]
    pub fn required() -> &'static [CanonicalField] {
        &[CanonicalField::Status, CanonicalField::Date, CanonicalField::Contact]
    }

    /// String form used in API payloads and warnings.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Status => "status",
            CanonicalField::Date => "date",
            CanonicalField::Contact => "contact",
            CanonicalField::Pk => "pk",
            CanonicalField::LastTouch => "last_touch",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Canonical field → source column assignment.
///
/// The required slots are plain `String`s so a stored mapping can never be
/// missing them; absence is only representable at the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    /// Column holding the record's business status.
    pub status: String,
    /// Column holding the record's primary date.
    pub date: String,
    /// Column holding the contact (email, phone, name).
    pub contact: String,
    /// Column holding the primary key; defaults to `id` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<String>,
    /// Column holding the last-touch timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_touch: Option<String>,
}

impl FieldMap {
    /// The effective primary-key column.
    #[must_use]
    pub fn pk_field(&self) -> &str {
        match self.pk.as_deref() {
            Some(pk) if !pk.trim().is_empty() => pk,
            _ => DEFAULT_PK_COLUMN,
        }
    }

    /// Column mapped to a canonical field, when one is configured.
    #[must_use]
    pub fn column_for(&self, field: CanonicalField) -> Option<&str> {
        let column = match field {
            CanonicalField::Status => Some(self.status.as_str()),
            CanonicalField::Date => Some(self.date.as_str()),
            CanonicalField::Contact => Some(self.contact.as_str()),
            CanonicalField::Pk => self.pk.as_deref(),
            CanonicalField::LastTouch => self.last_touch.as_deref(),
        };
        column.filter(|c| !c.trim().is_empty())
    }

    /// All (canonical field, column) pairs with a non-blank column.
    pub fn entries(&self) -> impl Iterator<Item = (CanonicalField, &str)> + '_ {
        [
            CanonicalField::Status,
            CanonicalField::Date,
            CanonicalField::Contact,
            CanonicalField::Pk,
            CanonicalField::LastTouch,
        ]
        .into_iter()
        .filter_map(|field| self.column_for(field).map(|column| (field, column)))
    }

    /// Deduplicated list of mapped source columns.
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for (_, column) in self.entries() {
            if !columns.iter().any(|c| c == column) {
                columns.push(column.to_string());
            }
        }
        columns
    }

    /// Mapped columns guaranteed to include the effective primary key.
    #[must_use]
    pub fn fetch_columns(&self) -> Vec<String> {
        let mut columns = self.columns();
        let pk = self.pk_field();
        if !columns.iter().any(|c| c == pk) {
            columns.push(pk.to_string());
        }
        columns
    }
}

/// A stored field mapping.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FieldMapping {
    /// Unique identifier.
    pub id: Uuid,

    /// Tenant owning this mapping.
    pub tenant_id: Uuid,

    /// Connection the resource lives on; None for built-in resources.
    pub connection_id: Option<Uuid>,

    /// External resource (table) name.
    pub resource: String,

    /// Canonical field assignments.
    pub fields: Json<FieldMap>,

    /// When the mapping last passed validation.
    pub validated_at: Option<DateTime<Utc>>,

    /// When the mapping was created.
    pub created_at: DateTime<Utc>,

    /// When the mapping was last updated.
    pub updated_at: DateTime<Utc>,
}

impl FieldMapping {
    /// Find a mapping by ID within a tenant.
    pub async fn find_by_id(
        pool: &PgPool,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM field_mappings
            WHERE id = $1 AND tenant_id = $2
            ",
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
    }

    /// List all mappings for a connection.
    pub async fn list_by_connection(
        pool: &PgPool,
        tenant_id: Uuid,
        connection_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as(
            r"
            SELECT * FROM field_mappings
            WHERE tenant_id = $1 AND connection_id = $2
            ORDER BY resource
            ",
        )
        .bind(tenant_id)
        .bind(connection_id)
        .fetch_all(pool)
        .await
    }

    /// Insert or update the mapping for (tenant, connection, resource).
    pub async fn upsert(
        pool: &PgPool,
        tenant_id: Uuid,
        connection_id: Option<Uuid>,
        resource: &str,
        fields: &FieldMap,
        validated_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            r"
            INSERT INTO field_mappings (tenant_id, connection_id, resource, fields, validated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (tenant_id, connection_id, resource)
            DO UPDATE SET
                fields = EXCLUDED.fields,
                validated_at = EXCLUDED.validated_at,
                updated_at = NOW()
            RETURNING *
            ",
        )
        .bind(tenant_id)
        .bind(connection_id)
        .bind(resource)
        .bind(Json(fields))
        .bind(validated_at)
        .fetch_one(pool)
        .await
    }
}
