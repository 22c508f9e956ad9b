//! Credential encryption.
//!
//! AES-256-GCM with HKDF-SHA256 per-tenant key derivation. Ciphertext layout
//! is `nonce || ciphertext || tag`; the tenant id salts the derived key so
//! material leaked from one tenant cannot decrypt another's.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{ConnectorError, ConnectorResult};

/// AES-256 key length in bytes.
const KEY_LENGTH: usize = 32;

/// GCM nonce length in bytes.
const NONCE_LENGTH: usize = 12;

/// GCM authentication tag length in bytes.
const TAG_LENGTH: usize = 16;

/// Domain-separation context for HKDF expansion.
const HKDF_INFO: &[u8] = b"mirador-source-credentials-v1";

/// Encrypts and decrypts stored source credentials.
#[derive(Clone)]
pub struct CredentialEncryption {
    master_key: [u8; KEY_LENGTH],
}

impl CredentialEncryption {
    /// Create an encryption service from a 32-byte master key.
    #[must_use]
    pub fn new(master_key: [u8; KEY_LENGTH]) -> Self {
        Self { master_key }
    }

    /// Load the master key from a hex string.
    pub fn from_hex(hex_key: &str) -> ConnectorResult<Self> {
        let bytes = hex::decode(hex_key).map_err(|e| ConnectorError::EncryptionFailed {
            message: format!("invalid hex key: {e}"),
        })?;
        Self::from_bytes(&bytes)
    }

    /// Load the master key from a base64 string.
    pub fn from_base64(b64_key: &str) -> ConnectorResult<Self> {
        use base64::{engine::general_purpose::STANDARD, Engine};

        let bytes = STANDARD
            .decode(b64_key)
            .map_err(|e| ConnectorError::EncryptionFailed {
                message: format!("invalid base64 key: {e}"),
            })?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> ConnectorResult<Self> {
        if bytes.len() != KEY_LENGTH {
            return Err(ConnectorError::EncryptionFailed {
                message: format!("key must be {KEY_LENGTH} bytes, got {}", bytes.len()),
            });
        }
        let mut key = [0u8; KEY_LENGTH];
        key.copy_from_slice(bytes);
        Ok(Self::new(key))
    }

    /// Derive the tenant-specific key.
    ///
    /// HKDF-SHA256 always supports a 32-byte output, so expansion cannot
    /// fail here.
    fn derive_tenant_key(&self, tenant_id: Uuid) -> [u8; KEY_LENGTH] {
        let hkdf = Hkdf::<Sha256>::new(Some(tenant_id.as_bytes()), &self.master_key);
        let mut derived = [0u8; KEY_LENGTH];
        hkdf.expand(HKDF_INFO, &mut derived)
            .expect("HKDF-SHA256 supports 32-byte output");
        derived
    }

    /// Encrypt plaintext for a tenant. Returns `nonce || ciphertext || tag`.
    pub fn encrypt(&self, tenant_id: Uuid, plaintext: &[u8]) -> ConnectorResult<Vec<u8>> {
        let key = self.derive_tenant_key(tenant_id);
        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|e| ConnectorError::EncryptionFailed {
                message: format!("failed to create cipher: {e}"),
            })?;

        use rand::rngs::OsRng;
        use rand::RngCore;
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext =
            cipher
                .encrypt(nonce, plaintext)
                .map_err(|e| ConnectorError::EncryptionFailed {
                    message: format!("encryption failed: {e}"),
                })?;

        let mut out = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt `nonce || ciphertext || tag` for a tenant.
    pub fn decrypt(&self, tenant_id: Uuid, ciphertext: &[u8]) -> ConnectorResult<Vec<u8>> {
        if ciphertext.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(ConnectorError::DecryptionFailed {
                message: "ciphertext too short".to_string(),
            });
        }

        let key = self.derive_tenant_key(tenant_id);
        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|e| ConnectorError::DecryptionFailed {
                message: format!("failed to create cipher: {e}"),
            })?;

        let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_LENGTH);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
            .map_err(|e| ConnectorError::DecryptionFailed {
                message: format!("decryption failed: {e}"),
            })
    }

    /// Encrypt a string credential.
    pub fn encrypt_string(&self, tenant_id: Uuid, plaintext: &str) -> ConnectorResult<Vec<u8>> {
        self.encrypt(tenant_id, plaintext.as_bytes())
    }

    /// Decrypt a string credential.
    pub fn decrypt_string(&self, tenant_id: Uuid, ciphertext: &[u8]) -> ConnectorResult<String> {
        let plaintext = self.decrypt(tenant_id, ciphertext)?;
        String::from_utf8(plaintext).map_err(|e| ConnectorError::DecryptionFailed {
            message: format!("decrypted data is not valid UTF-8: {e}"),
        })
    }
}

impl std::fmt::Debug for CredentialEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialEncryption")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random master key. Initial setup and tests only.
#[must_use]
pub fn generate_master_key() -> [u8; KEY_LENGTH] {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut key = [0u8; KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    key
}
