//! PostgreSQL adapter for the mirador connector contract.
//!
//! Implements [`SourceConnector`](mirador_connector::SourceConnector) over a
//! lazily created `SQLx` pool. Supabase sources speak the same wire protocol
//! and reuse this adapter; `MySQL` needs its own and is rejected by the
//! factory until one exists.

pub mod connector;
pub mod factory;

pub use connector::PostgresSourceConnector;
pub use factory::SqlSourceFactory;
