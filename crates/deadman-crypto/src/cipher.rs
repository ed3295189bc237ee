use chacha20poly1305::aead::{Aead, AeadCore, KeyInit, OsRng};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use tracing::info;

use crate::{fernet, sha256_hex, CryptoError, PayloadKey, KEY_LEN};

const ENVELOPE_VERSION: u8 = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Sealed layout: `version (1) || nonce (12) || ciphertext+tag`.
///
/// `decrypt` also opens Fernet tokens made with the same key.
pub struct PayloadCipher {
    aead: ChaCha20Poly1305,
    key: [u8; KEY_LEN],
}

impl PayloadCipher {
    pub fn new(key: &PayloadKey) -> Self {
        Self { aead: ChaCha20Poly1305::new(Key::from_slice(key.as_bytes())), key: *key.as_bytes() }
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        info!("encrypting payload {}", sha256_hex(plaintext));
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self.aead.encrypt(&nonce, plaintext).map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        sealed.push(ENVELOPE_VERSION);
        sealed.extend_from_slice(nonce.as_slice());
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    pub fn decrypt(&self, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
        info!("decrypting payload {}", sha256_hex(sealed));
        if sealed.first() != Some(&ENVELOPE_VERSION) {
            if let Some(token) = fernet::decode_token(sealed) {
                info!("payload is a fernet token");
                return fernet::decrypt_token(&self.key, &token);
            }
        }
        if sealed.len() < 1 + NONCE_LEN + TAG_LEN || sealed[0] != ENVELOPE_VERSION {
            return Err(CryptoError::Malformed);
        }
        let (nonce, ciphertext) = sealed[1..].split_at(NONCE_LEN);
        self.aead
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| CryptoError::Authentication)
    }
}
