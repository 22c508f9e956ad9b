//! Request/response types for mapping validation.
//!
//! Transport-agnostic: the HTTP layer serializes these as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use mirador_db::models::{CanonicalField, FieldMap};

use crate::quality::QualityMetrics;

/// Stable issue codes surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// A required canonical field has no column mapped.
    RequiredField,
    /// A mapped column does not exist on the resource.
    InvalidColumn,
    /// The referenced connection does not exist.
    ConnectionNotFound,
    /// The source rejected the connection attempt.
    ConnectionFailed,
    /// Any other failure while talking to the source.
    ValidationError,
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = match self {
            IssueCode::RequiredField => "REQUIRED_FIELD",
            IssueCode::InvalidColumn => "INVALID_COLUMN",
            IssueCode::ConnectionNotFound => "CONNECTION_NOT_FOUND",
            IssueCode::ConnectionFailed => "CONNECTION_FAILED",
            IssueCode::ValidationError => "VALIDATION_ERROR",
        };
        write!(f, "{code}")
    }
}

/// One actionable problem found during validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// The canonical field the issue is scoped to, or `connection` for
    /// connection-level problems.
    pub field: String,
    /// Stable issue code.
    pub code: IssueCode,
    /// Human-readable description naming the offending column/resource.
    pub message: String,
}

impl ValidationIssue {
    /// A required canonical field is unmapped.
    #[must_use]
    pub fn required_field(field: CanonicalField) -> Self {
        Self {
            field: field.as_str().to_string(),
            code: IssueCode::RequiredField,
            message: format!("Required field '{field}' is not mapped to a column"),
        }
    }

    /// A mapped column is absent from the resource.
    #[must_use]
    pub fn invalid_column(field: CanonicalField, column: &str, resource: &str) -> Self {
        Self {
            field: field.as_str().to_string(),
            code: IssueCode::InvalidColumn,
            message: format!(
                "Column '{column}' mapped to '{field}' does not exist on resource '{resource}'"
            ),
        }
    }

    /// The referenced connection does not exist.
    #[must_use]
    pub fn connection_not_found(connection_id: Option<Uuid>) -> Self {
        let message = match connection_id {
            Some(id) => format!("Connection {id} was not found"),
            None => "No connection was specified for this resource".to_string(),
        };
        Self {
            field: "connection".to_string(),
            code: IssueCode::ConnectionNotFound,
            message,
        }
    }

    /// The connectivity check failed.
    #[must_use]
    pub fn connection_failed(detail: impl fmt::Display) -> Self {
        Self {
            field: "connection".to_string(),
            code: IssueCode::ConnectionFailed,
            message: format!("Could not connect to the source: {detail}"),
        }
    }

    /// Any other error while talking to the source.
    #[must_use]
    pub fn validation_error(detail: impl fmt::Display) -> Self {
        Self {
            field: "connection".to_string(),
            code: IssueCode::ValidationError,
            message: format!("Validation failed: {detail}"),
        }
    }
}

/// Proposed canonical field assignments, as submitted by a caller.
///
/// Unlike the stored [`FieldMap`], every slot is optional here; turning
/// this into a `FieldMap` is the required-field check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposedFields {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub pk: Option<String>,
    #[serde(default)]
    pub last_touch: Option<String>,
}

impl ProposedFields {
    fn required_slot(&self, field: CanonicalField) -> Option<&str> {
        let value = match field {
            CanonicalField::Status => self.status.as_deref(),
            CanonicalField::Date => self.date.as_deref(),
            CanonicalField::Contact => self.contact.as_deref(),
            CanonicalField::Pk | CanonicalField::LastTouch => return None,
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Canonical required fields with no usable column (blank counts as
    /// absent).
    #[must_use]
    pub fn missing_required(&self) -> Vec<CanonicalField> {
        CanonicalField::required()
            .iter()
            .copied()
            .filter(|field| self.required_slot(*field).is_none())
            .collect()
    }

    /// Build the typed field map. Returns None when a required slot is
    /// missing; call [`missing_required`](Self::missing_required) first for
    /// per-field issues.
    #[must_use]
    pub fn into_field_map(self) -> Option<FieldMap> {
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        Some(FieldMap {
            status: non_blank(self.status)?,
            date: non_blank(self.date)?,
            contact: non_blank(self.contact)?,
            pk: non_blank(self.pk),
            last_touch: non_blank(self.last_touch),
        })
    }
}

/// Request to validate (and optionally save) a mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateMappingRequest {
    /// Connection the resource lives on. None means a built-in resource,
    /// which this service does not handle.
    pub connection_id: Option<Uuid>,
    /// External resource (table) name.
    pub resource: String,
    /// Proposed canonical field assignments.
    pub fields: ProposedFields,
    /// When true, produce a preview without persisting anything.
    #[serde(default)]
    pub validate_only: bool,
}

/// Connectivity/feasibility summary shown alongside the preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingHealth {
    pub resource_exists: bool,
    pub columns_mapped: bool,
    pub sample_rows_found: usize,
    pub last_validated: DateTime<Utc>,
}

/// One sampled row projected onto the canonical fields.
///
/// Values are display strings: dates ISO-formatted, anything missing or
/// unparseable rendered as an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewRow {
    pub pk: String,
    pub status: String,
    pub date: String,
    pub contact: String,
    pub last_touch: String,
}

/// Preview returned for user confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingPreview {
    pub rows: Vec<PreviewRow>,
    pub health: MappingHealth,
    pub metrics: QualityMetrics,
}

/// Summary returned after a mapping is persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSummary {
    pub resource: String,
    pub fields: FieldMap,
    pub metrics: QualityMetrics,
}

/// Outcome of a validation request.
///
/// Issues and preview are mutually exclusive: a failed validation never
/// carries a partial preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationResponse {
    /// Validation failed; every collected issue is included.
    Failure {
        ok: bool,
        issues: Vec<ValidationIssue>,
    },
    /// Validation passed in preview-only mode.
    Preview { ok: bool, preview: MappingPreview },
    /// Validation passed and the mapping was persisted.
    Saved {
        ok: bool,
        mapping_id: Uuid,
        summary: MappingSummary,
    },
}

impl ValidationResponse {
    /// Build a failure response.
    #[must_use]
    pub fn failure(issues: Vec<ValidationIssue>) -> Self {
        ValidationResponse::Failure { ok: false, issues }
    }

    /// Build a preview response.
    #[must_use]
    pub fn preview(preview: MappingPreview) -> Self {
        ValidationResponse::Preview { ok: true, preview }
    }

    /// Build a saved response.
    #[must_use]
    pub fn saved(mapping_id: Uuid, summary: MappingSummary) -> Self {
        ValidationResponse::Saved {
            ok: true,
            mapping_id,
            summary,
        }
    }

    /// Whether validation succeeded.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        !matches!(self, ValidationResponse::Failure { .. })
    }

    /// The issues carried by a failure response.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            ValidationResponse::Failure { issues, .. } => issues,
            _ => &[],
        }
    }
}
