use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use deadman_activity::{
    ActivitySource, RateLimitedActivityClient, ReqwestTransport, ThreadSleeper, DEFAULT_API_BASE_URL,
    DEFAULT_REQUEST_TIMEOUT,
};
use deadman_core::{
    ActivitySnapshot, Clock, RetryPolicy, SystemClock, DEFAULT_MAX_RATE_LIMIT_WAIT_SECS, DEFAULT_MAX_RETRIES,
};
use deadman_crypto::{PayloadKey, KEY_ENV};
use deadman_runner::{
    load_or_create_key_file, open_file, resolve_key, seal_file, Runner, RunnerOptions, SwitchConfig,
    DEFAULT_CONFIG_PATH, DEFAULT_STATE_PATH,
};
use deadman_state::{JsonFileStateStore, StateStore};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deadman", version, about = "Release a sealed payload after a stretch of GitHub inactivity")]
struct Cli {
    /// Config file (JSON, or TOML when it ends in .toml)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// State file
    #[arg(long, global = true, default_value = DEFAULT_STATE_PATH)]
    state: PathBuf,

    #[arg(long, global = true, default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Rate-limit retries before giving up
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Longest single wait for a rate-limit reset
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_RATE_LIMIT_WAIT_SECS)]
    max_rate_limit_wait_secs: u64,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a template config if none exists
    Init,

    /// One pass: fetch activity, evaluate, release if inactive
    Run,

    /// Verify the key, config and sealed payload without releasing anything
    #[command(alias = "doctor")]
    Check,

    /// Show config and persisted state
    Status,

    /// Print the last public activity for a user
    Activity {
        username: String,
        /// Treat an unknown user as having no activity
        #[arg(long)]
        handle_404: bool,
    },

    /// Print a new payload key
    Keygen {
        /// Write the key here instead of printing it
        #[arg(long)]
        key_file: Option<PathBuf>,
    },

    /// Seal a plaintext file into the payload file
    Encrypt {
        #[arg(long, default_value = "payload.md")]
        input: PathBuf,
        #[arg(long, default_value = "payload.enc")]
        output: PathBuf,
        /// Key file to use, created if missing. Defaults to the environment key
        #[arg(long)]
        key_file: Option<PathBuf>,
    },

    /// Open a sealed payload file
    Decrypt {
        #[arg(long, default_value = "payload.enc")]
        input: PathBuf,
        #[arg(long)]
        output: PathBuf,
        #[arg(long)]
        key_file: Option<PathBuf>,
    },
}

impl Cli {
    fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            config_path: self.config.clone(),
            state_path: self.state.clone(),
            api_base_url: self.api_base_url.clone(),
            retry: RetryPolicy { max_retries: self.max_retries, max_wait_secs: self.max_rate_limit_wait_secs },
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match &cli.cmd {
        Command::Init => {
            if Runner::init(&cli.config)? {
                println!("Wrote template config to {}; set username before the first run", cli.config.display());
            } else {
                println!("{} already exists", cli.config.display());
            }
        }
        Command::Run => {
            let runner = Runner::open(&cli.runner_options())?;
            let report = runner.run_once()?;
            println!("{:?}: {} days inactive", report.outcome, report.state.inactivity_days);
            if let Some(path) = report.released_to {
                println!("payload released to {}", path.display());
            }
        }
        Command::Check => {
            let runner = Runner::open(&cli.runner_options())?;
            let report = runner.doctor()?;
            println!("OK ({} bytes, sha256 {})", report.payload_len, report.payload_sha256);
        }
        Command::Status => {
            match SwitchConfig::load_from(&cli.config) {
                Ok(cfg) => println!("config: {}", serde_json::to_string_pretty(&cfg)?),
                Err(e) => println!("config: {e:#}"),
            }
            let state = JsonFileStateStore::new(cli.state.clone()).load();
            println!("state: {}", serde_json::to_string_pretty(&state)?);
        }
        Command::Activity { username, handle_404 } => {
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let client = RateLimitedActivityClient::new(
                cli.api_base_url.clone(),
                cli.runner_options().retry,
                Box::new(ReqwestTransport::new(DEFAULT_REQUEST_TIMEOUT).context("build http client")?),
                Box::new(ThreadSleeper),
                clock.clone(),
            );
            let records = client.fetch(username, *handle_404)?;
            let snapshot = ActivitySnapshot::from_records(&records);
            match (snapshot.last_activity, snapshot.inactivity_days(clock.now())) {
                (Some(at), Some(days)) => println!("{username}: last active {} ({days} days ago)", at.to_rfc3339()),
                _ => println!("{username}: no public activity in the last 90 days"),
            }
        }
        Command::Keygen { key_file } => match key_file {
            Some(path) => {
                let (_, created) = load_or_create_key_file(path)?;
                if !created {
                    anyhow::bail!("{} already exists", path.display());
                }
                println!("Wrote key to {}", path.display());
            }
            None => println!("{}", PayloadKey::generate().encode()),
        },
        Command::Encrypt { input, output, key_file } => {
            let key = match key_file {
                Some(path) => load_or_create_key_file(path)?.0,
                None => PayloadKey::from_env().with_context(|| format!("set {KEY_ENV} or pass --key-file"))?,
            };
            let digest = seal_file(&key, input, output)?;
            info!("sealed {} (sha256 {digest})", input.display());
            println!("Encrypted {} -> {}", input.display(), output.display());
        }
        Command::Decrypt { input, output, key_file } => {
            let key = resolve_key(key_file.as_deref())?;
            let digest = open_file(&key, input, output)?;
            info!("opened {} (sha256 {digest})", input.display());
            println!("Decrypted {} -> {}", input.display(), output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_reach_runner_options() {
        let cli = Cli::parse_from(["deadman", "run", "--config", "deadman.toml", "--max-retries", "5"]);
        let opts = cli.runner_options();
        assert_eq!(opts.config_path, PathBuf::from("deadman.toml"));
        assert_eq!(opts.state_path, PathBuf::from("state.json"));
        assert_eq!(opts.retry, RetryPolicy { max_retries: 5, max_wait_secs: 600 });
    }

    #[test]
    fn doctor_is_an_alias_for_check() {
        let cli = Cli::parse_from(["deadman", "doctor"]);
        assert!(matches!(cli.cmd, Command::Check));
    }
}
