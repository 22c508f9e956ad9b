//! Mapping validation for external data sources.
//!
//! Given a connection, a resource, and a proposed canonical field mapping,
//! the [`MappingValidator`] checks the mapping against the live schema,
//! scores a bounded sample for usability, and either returns a preview or
//! persists the mapping with an audit record.
//!
//! # Modules
//!
//! - [`validator`] - The validation flow
//! - [`quality`] - Data quality scoring over sampled rows
//! - [`types`] - Request/response DTOs and issue codes
//! - [`store`] - Persistence seams and their `PostgreSQL` implementation
//! - [`error`] - `MappingError`

pub mod error;
pub mod quality;
pub mod store;
pub mod types;
pub mod validator;

pub use error::{MappingError, Result};
pub use quality::{score_sample, QualityMetrics};
pub use store::{ConnectionStore, MappingStore, PgCatalogStore};
pub use types::{
    IssueCode, MappingHealth, MappingPreview, MappingSummary, PreviewRow, ProposedFields,
    ValidateMappingRequest, ValidationIssue, ValidationResponse,
};
pub use validator::MappingValidator;
