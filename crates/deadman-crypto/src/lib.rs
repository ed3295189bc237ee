//! Authenticated encryption for the sealed payload.

pub mod cipher;
mod fernet;
pub mod key;

pub use cipher::*;
pub use key::*;

use sha2::{Digest, Sha256};

/// Hex SHA-256, used to identify payloads in logs without printing them.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
