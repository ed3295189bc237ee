use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use deadman_core::{TriggerPolicy, MAX_THRESHOLD_DAYS, MIN_THRESHOLD_DAYS};

use crate::util::expand_path;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";
pub const DEFAULT_STATE_PATH: &str = "state.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("config field 'inactivity_days' must be between 1 and 90, got {0}")]
    InactivityDaysOutOfRange(u32),
    #[error("config field '{0}' must not be empty")]
    Empty(&'static str),
}

/// Static switch settings. Every field is required; there are no defaults on load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SwitchConfig {
    pub username: String,
    pub inactivity_days: u32,
    pub payload_path: String,
    pub output_path: String,
    pub one_shot: bool,
    pub handle_404: bool,
}

impl SwitchConfig {
    pub fn template() -> Self {
        Self {
            username: "TARGET_GITHUB_USERNAME".to_string(),
            inactivity_days: 60,
            payload_path: "payload.enc".to_string(),
            output_path: "README.md".to_string(),
            one_shot: false,
            handle_404: true,
        }
    }

    /// Load and validate. JSON unless the file ends in `.toml`.
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let cfg: SwitchConfig = if is_toml(path) {
            toml::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        } else {
            serde_json::from_str(&s).with_context(|| format!("parse {}", path.display()))?
        };
        cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
        }
        let s = if is_toml(path) {
            toml::to_string_pretty(self).with_context(|| "serialize toml")?
        } else {
            serde_json::to_string_pretty(self).with_context(|| "serialize json")?
        };
        std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.trim().is_empty() {
            return Err(ConfigError::Empty("username"));
        }
        if self.payload_path.trim().is_empty() {
            return Err(ConfigError::Empty("payload_path"));
        }
        if self.output_path.trim().is_empty() {
            return Err(ConfigError::Empty("output_path"));
        }
        if !(MIN_THRESHOLD_DAYS..=MAX_THRESHOLD_DAYS).contains(&self.inactivity_days) {
            return Err(ConfigError::InactivityDaysOutOfRange(self.inactivity_days));
        }
        Ok(())
    }

    pub fn policy(&self) -> TriggerPolicy {
        TriggerPolicy { threshold_days: self.inactivity_days, one_shot: self.one_shot }
    }

    pub fn payload_path(&self) -> PathBuf {
        expand_path(&self.payload_path)
    }

    pub fn output_path(&self) -> PathBuf {
        expand_path(&self.output_path)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("toml")
}
