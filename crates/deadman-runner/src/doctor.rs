use anyhow::{anyhow, Result};
use deadman_crypto::{sha256_hex, PayloadCipher, PayloadKey};
use deadman_payload::FsPayloadStore;
use tracing::info;

use crate::{DecryptingRelease, SwitchConfig};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DoctorReport {
    pub payload_sha256: String,
    pub payload_len: usize,
}

/// Confirm the sealed payload opens with `key` without writing the plaintext anywhere.
pub fn doctor(cfg: &SwitchConfig, key: &PayloadKey) -> Result<DoctorReport> {
    let payload_path = cfg.payload_path();
    if !payload_path.exists() {
        return Err(anyhow!("payload {} not found; run `deadman encrypt` first", payload_path.display()));
    }

    let release = DecryptingRelease::new(
        Box::new(FsPayloadStore::new(payload_path, cfg.output_path())),
        PayloadCipher::new(key),
    );
    let plaintext = release.open()?;
    let report = DoctorReport { payload_sha256: sha256_hex(&plaintext), payload_len: plaintext.len() };
    info!("payload ok: {} bytes, sha256 {}", report.payload_len, report.payload_sha256);
    Ok(report)
}
