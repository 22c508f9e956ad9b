//! The `SourceConnector` trait and the factory seam.

use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::resolver::ResolvedSource;
use crate::types::{ColumnInfo, SourceKind, SourceRow};

/// Uniform access to one external data source.
///
/// An instance is exclusively owned by the single validation or sync
/// invocation that created it and must be closed on every exit path,
/// including mid-operation failures. Implementations hide vendor
/// differences; callers never see a driver type.
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Vendor of the underlying source.
    fn kind(&self) -> SourceKind;

    /// Display name for logs (host/database, never credentials).
    fn display_name(&self) -> &str;

    /// Liveness and credentials check.
    ///
    /// Returns `Ok(())` when the source is reachable and the credentials
    /// are accepted.
    async fn test_connection(&self) -> ConnectorResult<()>;

    /// Introspect the columns of one resource (table or collection).
    async fn list_columns(&self, resource: &str) -> ConnectorResult<Vec<ColumnInfo>>;

    /// Fetch a bounded sample of rows restricted to the given columns.
    ///
    /// The sample size is adapter-defined.
    async fn sample_data(
        &self,
        resource: &str,
        columns: &[String],
    ) -> ConnectorResult<Vec<SourceRow>>;

    /// Bounded full fetch of rows restricted to the given columns.
    ///
    /// `filter` is a column → expected-value map combined with AND; an empty
    /// map matches everything. Results never exceed `limit`.
    async fn query(
        &self,
        resource: &str,
        columns: &[String],
        filter: &SourceRow,
        limit: u32,
    ) -> ConnectorResult<Vec<SourceRow>>;

    /// Release the underlying connection or session.
    ///
    /// Safe to call more than once.
    async fn close(&self) -> ConnectorResult<()>;
}

/// Builds connectors from resolved connection settings.
///
/// The factory is the only place that dispatches on [`SourceKind`]; adding a
/// vendor means adding one arm here, not touching call sites.
#[async_trait]
pub trait ConnectorFactory: Send + Sync {
    /// Construct a connector for the given resolved source.
    async fn connect(&self, source: &ResolvedSource) -> ConnectorResult<Box<dyn SourceConnector>>;
}
