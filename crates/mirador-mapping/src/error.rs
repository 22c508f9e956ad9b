//! Error types for mapping validation.
//!
//! Domain outcomes (missing fields, bad columns, unreachable sources) are
//! not errors; they travel as issues inside the validation response. This
//! error type covers only the platform's own infrastructure failing.

use thiserror::Error;

use mirador_db::DbError;

/// Infrastructure error during validation.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Platform storage failed.
    #[error("storage error: {0}")]
    Store(#[from] DbError),

    /// Internal invariant broke.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for mapping operations.
pub type Result<T> = std::result::Result<T, MappingError>;
