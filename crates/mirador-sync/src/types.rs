//! Request/response types for sync passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Request to run one sync pass for a connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncRequest {
    pub connection_id: Uuid,
}

/// Overall outcome of a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    /// Every mapping synchronized.
    Success,
    /// At least one mapping failed; the others synchronized.
    Partial,
}

impl fmt::Display for PassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassStatus::Success => write!(f, "success"),
            PassStatus::Partial => write!(f, "partial"),
        }
    }
}

/// Per-mapping result of a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingSyncOutcome {
    pub mapping_id: Uuid,
    pub resource: String,
    pub inserted: usize,
    pub updated: usize,
    pub deactivated: usize,
    pub total_external: usize,
    pub total_mapped: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MappingSyncOutcome {
    /// A failed outcome carrying zero counts.
    #[must_use]
    pub fn failed(mapping_id: Uuid, resource: String, error: String) -> Self {
        Self {
            mapping_id,
            resource,
            inserted: 0,
            updated: 0,
            deactivated: 0,
            total_external: 0,
            total_mapped: 0,
            success: false,
            error: Some(error),
        }
    }
}

/// Response for a completed (possibly partial) pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPassResponse {
    pub ok: bool,
    pub status: PassStatus,
    pub last_synced_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_sync_at: Option<DateTime<Utc>>,
    pub results: Vec<MappingSyncOutcome>,
}
