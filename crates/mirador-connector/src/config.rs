//! Connection settings shared by source adapters.

use serde::{Deserialize, Serialize};

/// SSL mode for source connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// No SSL.
    Disable,
    /// Use SSL if available, but don't require it.
    #[default]
    Prefer,
    /// Require SSL.
    Require,
    /// Require SSL and verify the CA certificate.
    VerifyCa,
    /// Require SSL and verify CA and hostname.
    VerifyFull,
}

impl SslMode {
    /// String representation used in connection strings.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SslMode::Disable => "disable",
            SslMode::Prefer => "prefer",
            SslMode::Require => "require",
            SslMode::VerifyCa => "verify-ca",
            SslMode::VerifyFull => "verify-full",
        }
    }

    /// Mode for a boolean `ssl` flag stored in a vendor config blob.
    #[must_use]
    pub fn from_flag(enabled: bool) -> Self {
        if enabled {
            SslMode::Require
        } else {
            SslMode::Prefer
        }
    }
}

/// Pool and timeout knobs for a source connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Maximum number of pooled connections to the source.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Seconds to wait when establishing a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_pool_size() -> u32 {
    2
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ssl_mode_as_str() {
        assert_eq!(SslMode::Disable.as_str(), "disable");
        assert_eq!(SslMode::Prefer.as_str(), "prefer");
        assert_eq!(SslMode::Require.as_str(), "require");
        assert_eq!(SslMode::VerifyCa.as_str(), "verify-ca");
        assert_eq!(SslMode::VerifyFull.as_str(), "verify-full");
    }

    #[test]
    fn test_ssl_mode_from_flag() {
        assert_eq!(SslMode::from_flag(true), SslMode::Require);
        assert_eq!(SslMode::from_flag(false), SslMode::Prefer);
    }

    #[test]
    fn test_connection_settings_defaults() {
        let settings = ConnectionSettings::default();
        assert_eq!(settings.pool_size, 2);
        assert_eq!(settings.connect_timeout_secs, 10);
    }

    #[test]
    fn test_connection_settings_deserialization_fills_defaults() {
        let settings: ConnectionSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings.pool_size, 2);

        let settings: ConnectionSettings =
            serde_json::from_str(r#"{"pool_size": 8, "connect_timeout_secs": 3}"#).unwrap();
        assert_eq!(settings.pool_size, 8);
        assert_eq!(settings.connect_timeout_secs, 3);
    }
}
