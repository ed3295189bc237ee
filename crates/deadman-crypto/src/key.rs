use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use chacha20poly1305::aead::{KeyInit, OsRng};
use chacha20poly1305::ChaCha20Poly1305;
use thiserror::Error;

/// Environment variable holding the shared secret.
pub const KEY_ENV: &str = "PAYLOAD_KEY";

pub const KEY_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("no key found, please set {0}")]
    MissingKey(String),
    #[error("key must be 32 bytes encoded as url-safe base64")]
    InvalidKey,
    #[error("sealed payload is truncated or has an unknown format")]
    Malformed,
    #[error("payload failed authentication (wrong key or tampered data)")]
    Authentication,
    #[error("encryption failed")]
    Encrypt,
}

/// 32-byte ChaCha20-Poly1305 key. Encoded as url-safe base64 (44 chars, padded).
#[derive(Clone, PartialEq, Eq)]
pub struct PayloadKey([u8; KEY_LEN]);

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PayloadKey(..)")
    }
}

impl PayloadKey {
    pub fn generate() -> Self {
        let key = ChaCha20Poly1305::generate_key(&mut OsRng);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(key.as_slice());
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Accepts padded or unpadded url-safe base64; surrounding whitespace is ignored.
    pub fn decode(encoded: &str) -> Result<Self, CryptoError> {
        let trimmed = encoded.trim();
        let raw = URL_SAFE
            .decode(trimmed)
            .or_else(|_| URL_SAFE_NO_PAD.decode(trimmed))
            .map_err(|_| CryptoError::InvalidKey)?;
        let bytes: [u8; KEY_LEN] = raw.try_into().map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self(bytes))
    }

    pub fn encode(&self) -> String {
        URL_SAFE.encode(self.0)
    }

    pub fn from_env() -> Result<Self, CryptoError> {
        Self::from_env_var(KEY_ENV)
    }

    pub fn from_env_var(name: &str) -> Result<Self, CryptoError> {
        match std::env::var(name) {
            Ok(v) if !v.trim().is_empty() => Self::decode(&v),
            _ => Err(CryptoError::MissingKey(name.to_string())),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}
