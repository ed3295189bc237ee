use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use deadman_core::SwitchState;
use tracing::{info, warn};

use crate::schema::validate_state;
use crate::traits::StateStore;

/// Human-readable JSON state file, rewritten in full on every save.
pub struct JsonFileStateStore {
    path: PathBuf,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "state.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn read(&self) -> Result<SwitchState> {
        let s = std::fs::read_to_string(&self.path).with_context(|| format!("read {}", self.path.display()))?;
        let value: serde_json::Value =
            serde_json::from_str(&s).with_context(|| format!("parse {}", self.path.display()))?;
        Ok(validate_state(&value)?)
    }
}

impl StateStore for JsonFileStateStore {
    fn load(&self) -> SwitchState {
        match self.read() {
            Ok(state) => {
                info!("loaded state: {:?}", state);
                state
            }
            Err(e) => {
                warn!("{e:#}");
                let state = SwitchState::default();
                warn!("using default state: {:?}", state);
                state
            }
        }
    }

    fn save(&self, state: &SwitchState) -> Result<()> {
        info!("saving state: {:?}", state);
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
        }
        let bytes = serde_json::to_vec_pretty(state).context("serialize state")?;

        // Write-then-rename so a crash never leaves a half-written state file.
        let tmp = self.tmp_path();
        {
            let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {}", tmp.display()))?;
            f.write_all(&bytes).with_context(|| format!("write {}", tmp.display()))?;
            f.write_all(b"\n")?;
            f.sync_all().with_context(|| format!("sync {}", tmp.display()))?;
        }
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename {} -> {}", tmp.display(), self.path.display()))?;
        Ok(())
    }
}
