//! Connector error types.
//!
//! Error definitions with transient/permanent classification so callers can
//! decide whether a retry is worthwhile.

use thiserror::Error;

use crate::types::SourceKind;

/// Error that can occur while talking to an external data source.
#[derive(Debug, Error)]
pub enum ConnectorError {
    // Connection errors (usually transient)
    /// Failed to establish a connection to the source.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Connection attempt timed out.
    #[error("connection timeout after {timeout_secs} seconds")]
    ConnectionTimeout { timeout_secs: u64 },

    /// Source is temporarily unavailable.
    #[error("source unavailable: {message}")]
    SourceUnavailable { message: String },

    // Authentication errors (permanent)
    /// Credentials were rejected by the source.
    #[error("authentication failed: invalid credentials")]
    AuthenticationFailed,

    // Configuration errors (permanent)
    /// Connection settings are invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// No adapter is available for the requested vendor.
    #[error("unsupported source kind: {kind}")]
    UnsupportedSourceKind { kind: SourceKind },

    // Schema errors
    /// Schema introspection failed for a resource.
    #[error("introspection failed for '{resource}': {message}")]
    IntrospectionFailed { resource: String, message: String },

    /// The requested resource does not exist in the source.
    #[error("resource '{resource}' not found in source")]
    ResourceNotFound { resource: String },

    // Query errors
    /// A fetch against the source failed.
    #[error("query failed: {message}")]
    QueryFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Encryption errors
    /// Credential encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed { message: String },

    /// Credential decryption failed.
    #[error("decryption failed: {message}")]
    DecryptionFailed { message: String },

    // Internal errors
    /// Serialization of credential or row data failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal adapter error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl ConnectorError {
    /// Whether the operation may succeed on retry.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::ConnectionFailed { .. }
                | ConnectorError::ConnectionTimeout { .. }
                | ConnectorError::SourceUnavailable { .. }
        )
    }

    /// Whether retrying is pointless without operator intervention.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Stable code for classification in logs and API payloads.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            ConnectorError::ConnectionTimeout { .. } => "CONNECTION_TIMEOUT",
            ConnectorError::SourceUnavailable { .. } => "SOURCE_UNAVAILABLE",
            ConnectorError::AuthenticationFailed => "AUTH_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::UnsupportedSourceKind { .. } => "UNSUPPORTED_KIND",
            ConnectorError::IntrospectionFailed { .. } => "INTROSPECTION_FAILED",
            ConnectorError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            ConnectorError::QueryFailed { .. } => "QUERY_FAILED",
            ConnectorError::EncryptionFailed { .. } => "ENCRYPTION_FAILED",
            ConnectorError::DecryptionFailed { .. } => "DECRYPTION_FAILED",
            ConnectorError::Serialization { .. } => "SERIALIZATION_ERROR",
            ConnectorError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with an underlying cause.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a query failed error.
    pub fn query_failed(message: impl Into<String>) -> Self {
        ConnectorError::QueryFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a query failed error with an underlying cause.
    pub fn query_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::QueryFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ConnectorError::Internal {
            message: message.into(),
            source: None,
        }
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let transient = vec![
            ConnectorError::connection_failed("refused"),
            ConnectorError::ConnectionTimeout { timeout_secs: 30 },
            ConnectorError::SourceUnavailable {
                message: "maintenance window".to_string(),
            },
        ];

        for err in transient {
            assert!(err.is_transient(), "expected {} to be transient", err.error_code());
            assert!(!err.is_permanent());
        }
    }

    #[test]
    fn test_permanent_errors() {
        let permanent = vec![
            ConnectorError::AuthenticationFailed,
            ConnectorError::InvalidConfiguration {
                message: "host is required".to_string(),
            },
            ConnectorError::UnsupportedSourceKind {
                kind: SourceKind::Mysql,
            },
            ConnectorError::ResourceNotFound {
                resource: "deals".to_string(),
            },
        ];

        for err in permanent {
            assert!(err.is_permanent(), "expected {} to be permanent", err.error_code());
            assert!(!err.is_transient());
        }
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ConnectorError::connection_failed("x").error_code(),
            "CONNECTION_FAILED"
        );
        assert_eq!(ConnectorError::AuthenticationFailed.error_code(), "AUTH_FAILED");
        assert_eq!(ConnectorError::query_failed("x").error_code(), "QUERY_FAILED");
    }

    #[test]
    fn test_error_display() {
        let err = ConnectorError::ConnectionTimeout { timeout_secs: 15 };
        assert_eq!(err.to_string(), "connection timeout after 15 seconds");

        let err = ConnectorError::ResourceNotFound {
            resource: "leads".to_string(),
        };
        assert_eq!(err.to_string(), "resource 'leads' not found in source");
    }

    #[test]
    fn test_error_with_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = ConnectorError::connection_failed_with_source("dial failed", cause);

        assert!(err.is_transient());
        if let ConnectorError::ConnectionFailed { source, .. } = &err {
            assert!(source.is_some());
        } else {
            panic!("expected ConnectionFailed variant");
        }
    }
}
