use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use deadman_activity::{
    RateLimitedActivityClient, ReqwestTransport, ThreadSleeper, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT,
};
use deadman_core::{Clock, RetryPolicy, SystemClock};
use deadman_crypto::{PayloadCipher, PayloadKey};
use deadman_payload::FsPayloadStore;
use deadman_state::JsonFileStateStore;
use tracing::info;

use crate::{doctor, DecryptingRelease, DoctorReport, RunReport, SwitchConfig, TriggerEngine};
use crate::{DEFAULT_CONFIG_PATH, DEFAULT_STATE_PATH};

#[derive(Clone, Debug)]
pub struct RunnerOptions {
    pub config_path: PathBuf,
    pub state_path: PathBuf,
    pub api_base_url: String,
    pub retry: RetryPolicy,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            state_path: PathBuf::from(DEFAULT_STATE_PATH),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// The production wiring: real HTTP, real files, wall clock.
pub struct Runner {
    pub cfg: SwitchConfig,
    pub key: PayloadKey,
    pub store: JsonFileStateStore,
    pub activity: RateLimitedActivityClient,
    pub release: DecryptingRelease,
    pub clock: Arc<dyn Clock>,
}

impl Runner {
    /// Key first, then config. Either failing is fatal; a bad state file is not.
    pub fn open(opts: &RunnerOptions) -> Result<Self> {
        let key = PayloadKey::from_env()?;
        let cfg = SwitchConfig::load_from(&opts.config_path)?;
        info!(
            "watching {} (threshold {} days, one_shot={})",
            cfg.username, cfg.inactivity_days, cfg.one_shot
        );

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let transport = ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT).context("build http client")?;
        let activity = RateLimitedActivityClient::new(
            opts.api_base_url.clone(),
            opts.retry,
            Box::new(transport),
            Box::new(ThreadSleeper),
            clock.clone(),
        );
        let release = DecryptingRelease::new(
            Box::new(FsPayloadStore::new(cfg.payload_path(), cfg.output_path())),
            PayloadCipher::new(&key),
        );

        Ok(Self { store: JsonFileStateStore::new(opts.state_path.clone()), cfg, key, activity, release, clock })
    }

    pub fn engine(&self) -> TriggerEngine<'_> {
        TriggerEngine {
            config: &self.cfg,
            activity: &self.activity,
            store: &self.store,
            release: &self.release,
            clock: self.clock.as_ref(),
        }
    }

    pub fn run_once(&self) -> Result<RunReport> {
        self.engine().run()
    }

    pub fn doctor(&self) -> Result<DoctorReport> {
        doctor(&self.cfg, &self.key)
    }

    /// Write a template config unless one exists. Returns whether it wrote.
    pub fn init(config_path: &Path) -> Result<bool> {
        if config_path.exists() {
            return Ok(false);
        }
        SwitchConfig::template().save_to(config_path)?;
        Ok(true)
    }
}
