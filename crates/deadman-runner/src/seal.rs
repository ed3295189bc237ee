use std::path::Path;

use anyhow::{Context, Result};
use deadman_crypto::{sha256_hex, PayloadCipher, PayloadKey};
use deadman_payload::{read_bytes, write_bytes};
use tracing::info;

/// Key from `--key-file` when given, otherwise from the environment.
pub fn resolve_key(key_file: Option<&Path>) -> Result<PayloadKey> {
    match key_file {
        Some(path) => read_key_file(path),
        None => Ok(PayloadKey::from_env()?),
    }
}

pub fn read_key_file(path: &Path) -> Result<PayloadKey> {
    let s = std::fs::read_to_string(path).with_context(|| format!("read key file {}", path.display()))?;
    PayloadKey::decode(&s).with_context(|| format!("decode key file {}", path.display()))
}

/// Reuse the key at `path`, or generate one and write it there.
/// Returns whether a new key was created.
pub fn load_or_create_key_file(path: &Path) -> Result<(PayloadKey, bool)> {
    if path.exists() {
        info!("using existing key {}", path.display());
        return Ok((read_key_file(path)?, false));
    }
    info!("generating key {}", path.display());
    let key = PayloadKey::generate();
    write_bytes(path, key.encode().as_bytes())?;
    Ok((key, true))
}

/// Encrypt `input` into `output`.
pub fn seal_file(key: &PayloadKey, input: &Path, output: &Path) -> Result<String> {
    let plaintext = read_bytes(input)?;
    let sealed = PayloadCipher::new(key).encrypt(&plaintext)?;
    write_bytes(output, &sealed)?;
    Ok(sha256_hex(&plaintext))
}

/// Decrypt `input` into `output`.
pub fn open_file(key: &PayloadKey, input: &Path, output: &Path) -> Result<String> {
    let sealed = read_bytes(input)?;
    let plaintext = PayloadCipher::new(key)
        .decrypt(&sealed)
        .with_context(|| format!("decrypt {}", input.display()))?;
    write_bytes(output, &plaintext)?;
    Ok(sha256_hex(&plaintext))
}
