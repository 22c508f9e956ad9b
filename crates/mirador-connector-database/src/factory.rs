//! Factory for SQL-backed source connectors.

use async_trait::async_trait;

use mirador_connector::config::ConnectionSettings;
use mirador_connector::error::{ConnectorError, ConnectorResult};
use mirador_connector::resolver::ResolvedSource;
use mirador_connector::types::SourceKind;
use mirador_connector::{ConnectorFactory, SourceConnector};

use crate::connector::PostgresSourceConnector;

/// Builds SQL connectors by vendor kind.
///
/// Postgres and Supabase share the `PostgreSQL` adapter; `MySQL` is part of
/// the vendor enum but has no adapter yet and is rejected here.
#[derive(Debug, Clone, Default)]
pub struct SqlSourceFactory {
    settings: ConnectionSettings,
}

impl SqlSourceFactory {
    /// Create a factory with default connection settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override pool and timeout settings for every connector built.
    #[must_use]
    pub fn with_settings(settings: ConnectionSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl ConnectorFactory for SqlSourceFactory {
    async fn connect(&self, source: &ResolvedSource) -> ConnectorResult<Box<dyn SourceConnector>> {
        match source.kind {
            SourceKind::Postgres | SourceKind::Supabase => Ok(Box::new(
                PostgresSourceConnector::new(source.clone(), self.settings.clone())?,
            )),
            SourceKind::Mysql => Err(ConnectorError::UnsupportedSourceKind {
                kind: SourceKind::Mysql,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mirador_connector::config::SslMode;

    fn resolved(kind: SourceKind) -> ResolvedSource {
        ResolvedSource {
            kind,
            host: "db.acme.test".to_string(),
            port: kind.default_port(),
            database: "crm".to_string(),
            username: "svc".to_string(),
            password: "pw".to_string(),
            ssl_mode: SslMode::Prefer,
            service_key: None,
            schema: None,
        }
    }

    #[tokio::test]
    async fn test_factory_builds_postgres_connector() {
        let factory = SqlSourceFactory::new();
        let connector = factory.connect(&resolved(SourceKind::Postgres)).await.unwrap();
        assert_eq!(connector.kind(), SourceKind::Postgres);
    }

    #[tokio::test]
    async fn test_factory_builds_supabase_over_postgres_wire() {
        let factory = SqlSourceFactory::new();
        let connector = factory.connect(&resolved(SourceKind::Supabase)).await.unwrap();
        assert_eq!(connector.kind(), SourceKind::Supabase);
    }

    #[tokio::test]
    async fn test_factory_rejects_mysql() {
        let factory = SqlSourceFactory::new();
        let err = factory.connect(&resolved(SourceKind::Mysql)).await.err().unwrap();
        assert_eq!(err.error_code(), "UNSUPPORTED_KIND");
    }
}
