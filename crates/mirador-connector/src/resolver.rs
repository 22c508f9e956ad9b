//! Credential resolution.
//!
//! Turns the encrypted material stored with a connection into the plaintext
//! settings an adapter needs. Decryption failures propagate as connector
//! errors; the resolver never logs or returns partial secrets.

use serde_json::Value;
use uuid::Uuid;

use crate::config::SslMode;
use crate::crypto::CredentialEncryption;
use crate::error::{ConnectorError, ConnectorResult};
use crate::types::SourceKind;

/// Encrypted credential material as persisted with a connection.
///
/// Service crates build this view from their stored connection record; the
/// resolver itself has no storage dependency.
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    /// Tenant owning the connection (salts key derivation).
    pub tenant_id: Uuid,
    /// Vendor of the source.
    pub kind: SourceKind,
    /// Source host.
    pub host: String,
    /// Source port, when not the vendor default.
    pub port: Option<u16>,
    /// Database name.
    pub database: String,
    /// Username.
    pub username: String,
    /// AEAD ciphertext of the password.
    pub password_encrypted: Vec<u8>,
    /// Vendor-specific config blob. Recognized keys: `ssl` (bool),
    /// `schema` (string), `service_key_encrypted` (base64 AEAD ciphertext).
    pub config: Value,
}

/// Plaintext connection settings ready for a [`ConnectorFactory`].
///
/// [`ConnectorFactory`]: crate::traits::ConnectorFactory
#[derive(Clone)]
pub struct ResolvedSource {
    pub kind: SourceKind,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl_mode: SslMode,
    /// Decrypted service key, for vendors that use one (Supabase).
    pub service_key: Option<String>,
    /// Schema to scope introspection and queries to.
    pub schema: Option<String>,
}

impl std::fmt::Debug for ResolvedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSource")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .field("service_key", &self.service_key.as_ref().map(|_| "[REDACTED]"))
            .field("schema", &self.schema)
            .finish()
    }
}

impl ResolvedSource {
    /// Display name for logs, credentials excluded.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!(
            "{}: {}@{}/{}",
            self.kind.as_str(),
            self.username,
            self.host,
            self.database
        )
    }
}

/// Resolves stored credentials into usable connector settings.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    encryption: CredentialEncryption,
}

impl CredentialResolver {
    /// Create a resolver over the given encryption service.
    #[must_use]
    pub fn new(encryption: CredentialEncryption) -> Self {
        Self { encryption }
    }

    /// Decrypt stored material into a [`ResolvedSource`].
    pub fn resolve(&self, stored: &StoredCredentials) -> ConnectorResult<ResolvedSource> {
        if stored.host.is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "host is required".to_string(),
            });
        }
        if stored.database.is_empty() {
            return Err(ConnectorError::InvalidConfiguration {
                message: "database is required".to_string(),
            });
        }

        let password = self
            .encryption
            .decrypt_string(stored.tenant_id, &stored.password_encrypted)?;

        let ssl_flag = stored
            .config
            .get("ssl")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let schema = stored
            .config
            .get("schema")
            .and_then(Value::as_str)
            .map(str::to_string);

        let service_key = match stored.config.get("service_key_encrypted") {
            Some(Value::String(b64)) => Some(self.decrypt_service_key(stored.tenant_id, b64)?),
            Some(Value::Null) | None => None,
            Some(other) => {
                return Err(ConnectorError::InvalidConfiguration {
                    message: format!(
                        "service_key_encrypted must be a base64 string, got {other}"
                    ),
                })
            }
        };

        Ok(ResolvedSource {
            kind: stored.kind,
            host: stored.host.clone(),
            port: stored.port.unwrap_or_else(|| stored.kind.default_port()),
            database: stored.database.clone(),
            username: stored.username.clone(),
            password,
            ssl_mode: SslMode::from_flag(ssl_flag),
            service_key,
            schema,
        })
    }

    fn decrypt_service_key(&self, tenant_id: Uuid, b64: &str) -> ConnectorResult<String> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let ciphertext = STANDARD
            .decode(b64)
            .map_err(|e| ConnectorError::DecryptionFailed {
                message: format!("service key is not valid base64: {e}"),
            })?;
        self.encryption.decrypt_string(tenant_id, &ciphertext)
    }
}
