use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

/// Where the sealed payload lives and where the released plaintext goes.
/// Both are opaque byte blobs.
pub trait PayloadStore: Send + Sync {
    fn read_sealed(&self) -> Result<Vec<u8>>;
    fn write_released(&self, bytes: &[u8]) -> Result<PathBuf>;
}

#[derive(Clone, Debug)]
pub struct FsPayloadStore {
    pub payload_path: PathBuf,
    pub output_path: PathBuf,
}

impl FsPayloadStore {
    pub fn new(payload_path: PathBuf, output_path: PathBuf) -> Self {
        Self { payload_path, output_path }
    }
}

impl PayloadStore for FsPayloadStore {
    fn read_sealed(&self) -> Result<Vec<u8>> {
        read_bytes(&self.payload_path)
    }

    fn write_released(&self, bytes: &[u8]) -> Result<PathBuf> {
        write_bytes(&self.output_path, bytes)?;
        info!("wrote {} bytes to {}", bytes.len(), self.output_path.display());
        Ok(self.output_path.clone())
    }
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("read {}", path.display()))
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}
