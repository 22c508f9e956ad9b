//! Sync reconciliation for mirrored external data.
//!
//! The [`SyncReconciler`] brings the mirrored record set for a connection's
//! mappings up to date with the live source: a bounded fetch is diffed
//! against the existing mirror, present rows are inserted or updated, and
//! absent rows flip inactive. A per-connection single-flight claim
//! guarantees at most one pass runs at a time.
//!
//! # Modules
//!
//! - [`reconciler`] - Pass orchestration and the per-mapping diff
//! - [`store`] - Persistence seam and its `PostgreSQL` implementation
//! - [`types`] - Request/response DTOs
//! - [`error`] - `SyncError`

pub mod error;
pub mod reconciler;
pub mod store;
pub mod types;

pub use error::{Result, SyncError};
pub use reconciler::{SyncReconciler, FETCH_LIMIT};
pub use store::{PgSyncStore, SyncStore};
pub use types::{MappingSyncOutcome, PassStatus, SyncPassResponse, SyncRequest};
