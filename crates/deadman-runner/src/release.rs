use std::path::PathBuf;

use anyhow::{Context, Result};
use deadman_crypto::{sha256_hex, PayloadCipher};
use deadman_payload::PayloadStore;
use tracing::info;

/// The irreversible step: make the secret readable.
pub trait PayloadRelease {
    fn release(&self) -> Result<PathBuf>;
}

/// Reads the sealed payload, decrypts it, writes the plaintext out.
pub struct DecryptingRelease {
    pub payload: Box<dyn PayloadStore>,
    pub cipher: PayloadCipher,
}

impl DecryptingRelease {
    pub fn new(payload: Box<dyn PayloadStore>, cipher: PayloadCipher) -> Self {
        Self { payload, cipher }
    }

    /// Decrypt without writing anything. Used by the self-check.
    pub fn open(&self) -> Result<Vec<u8>> {
        let sealed = self.payload.read_sealed().context("read sealed payload")?;
        let plaintext = self.cipher.decrypt(&sealed).context("decrypt payload")?;
        Ok(plaintext)
    }
}

impl PayloadRelease for DecryptingRelease {
    fn release(&self) -> Result<PathBuf> {
        let plaintext = self.open()?;
        info!("releasing payload {}", sha256_hex(&plaintext));
        self.payload.write_released(&plaintext).context("write released payload")
    }
}
