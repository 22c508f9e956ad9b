//! Platform storage for mirador.
//!
//! SQLx models and migrations for connections to external sources, field
//! mappings, validation audit rows, and the mirrored record set. Models are
//! tenant-scoped: every query binds a `tenant_id` alongside its key.
//!
//! # Modules
//!
//! - [`models`] - Row types with their query methods
//! - [`pool`] - Connection pool construction
//! - [`migrations`] - Embedded migration runner
//! - [`error`] - `DbError`

pub mod error;
pub mod migrations;
pub mod models;
pub mod pool;

pub use error::DbError;
pub use migrations::run_migrations;
pub use pool::DbPool;
