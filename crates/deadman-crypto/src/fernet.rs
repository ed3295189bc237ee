//! Read-only support for Fernet tokens, the format older payloads were sealed in.
//!
//! Token layout: `0x80 || timestamp (8) || iv (16) || aes-128-cbc ciphertext || hmac-sha256 (32)`,
//! url-safe base64 encoded. The 32-byte key splits into a signing half and an
//! encryption half, so the same `PAYLOAD_KEY` opens both formats.

use aes::Aes128;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine as _;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{CryptoError, KEY_LEN};

type HmacSha256 = Hmac<Sha256>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

const TOKEN_VERSION: u8 = 0x80;
const IV_OFFSET: usize = 1 + 8;
const HEADER_LEN: usize = IV_OFFSET + 16;
const MAC_LEN: usize = 32;
const BLOCK_LEN: usize = 16;

/// Base64-decoded token bytes when `sealed` looks like a Fernet token.
pub(crate) fn decode_token(sealed: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(sealed).ok()?.trim();
    let raw = URL_SAFE.decode(text).or_else(|_| URL_SAFE_NO_PAD.decode(text)).ok()?;
    (raw.first() == Some(&TOKEN_VERSION)).then_some(raw)
}

/// Verify and decrypt a decoded token. No TTL is enforced.
pub(crate) fn decrypt_token(key: &[u8; KEY_LEN], raw: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if raw.len() < HEADER_LEN + BLOCK_LEN + MAC_LEN || (raw.len() - HEADER_LEN - MAC_LEN) % BLOCK_LEN != 0 {
        return Err(CryptoError::Malformed);
    }
    let (signing_key, encryption_key) = key.split_at(KEY_LEN / 2);
    let (signed, tag) = raw.split_at(raw.len() - MAC_LEN);

    let mut mac = HmacSha256::new_from_slice(signing_key).map_err(|_| CryptoError::InvalidKey)?;
    mac.update(signed);
    mac.verify_slice(tag).map_err(|_| CryptoError::Authentication)?;

    let iv = &signed[IV_OFFSET..HEADER_LEN];
    let ciphertext = &signed[HEADER_LEN..];
    Aes128CbcDec::new_from_slices(encryption_key, iv)
        .map_err(|_| CryptoError::InvalidKey)?
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CryptoError::Authentication)
}
