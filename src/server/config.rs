use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::monitoring::probe::ProbeSettings;
use crate::monitoring::scheduler::{SchedulerConfig, ShardAssignment};
use crate::monitoring::streak::DEFAULT_FAILURE_THRESHOLD;
use crate::notifications::models::ChannelConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: SocketAddr,
    /// Postgres URL. Without it the process runs on the in-memory store.
    pub database_url: Option<String>,
    pub seed_file: Option<PathBuf>,
    pub log_dir: String,
    pub probe_timeout_ms: u64,
    pub probe_slow_threshold_ms: u64,
    pub failure_threshold: u32,
    pub reconcile_interval_secs: u64,
    pub shard: ShardAssignment,
    pub notification_channels: Vec<ChannelConfig>,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialServerConfig {
    listen_addr: Option<String>,
    database_url: Option<String>,
    seed_file: Option<PathBuf>,
    log_dir: Option<String>,
    probe_timeout_ms: Option<u64>,
    probe_slow_threshold_ms: Option<u64>,
    failure_threshold: Option<u32>,
    reconcile_interval_secs: Option<u64>,
    shard_index: Option<u32>,
    shard_count: Option<u32>,
}

/// Channels are structured, so they can only come from the file.
#[derive(Deserialize, Default, Debug)]
struct FileServerConfig {
    #[serde(flatten)]
    settings: PartialServerConfig,
    #[serde(default)]
    notification_channels: Vec<ChannelConfig>,
}

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_PROBE_TIMEOUT_MS: u64 = 2000;
const DEFAULT_PROBE_SLOW_THRESHOLD_MS: u64 = 300;
const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 300;

fn default_log_dir() -> String {
    "logs".to_string()
}

fn read_file_config(path: &Path) -> Result<FileServerConfig, ConfigError> {
    if !path.exists() {
        return Ok(FileServerConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl ServerConfig {
    /// Loads `.env`, then layers environment over the optional TOML file over
    /// defaults.
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load_from(config_path.map(Path::new), std::env::vars())
    }

    pub fn load_from<I>(config_path: Option<&Path>, env: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        // 1. Load from file (optional)
        let file_config = match config_path {
            Some(path) => read_file_config(path)?,
            None => FileServerConfig::default(),
        };
        let file = file_config.settings;

        // 2. Load from environment variables
        let env: PartialServerConfig = envy::from_iter(env)?;

        // 3. Merge: environment overrides file
        let listen_addr = env
            .listen_addr
            .or(file.listen_addr)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Invalid(format!("listen_addr {listen_addr:?} is not a socket address: {e}"))
        })?;

        let shard_index = env.shard_index.or(file.shard_index).unwrap_or(0);
        let shard_count = env.shard_count.or(file.shard_count).unwrap_or(1);
        let shard = ShardAssignment::new(shard_index, shard_count)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let failure_threshold = env
            .failure_threshold
            .or(file.failure_threshold)
            .unwrap_or(DEFAULT_FAILURE_THRESHOLD);
        if failure_threshold == 0 {
            return Err(ConfigError::Invalid(
                "failure_threshold must be at least 1".to_string(),
            ));
        }

        let reconcile_interval_secs = env
            .reconcile_interval_secs
            .or(file.reconcile_interval_secs)
            .unwrap_or(DEFAULT_RECONCILE_INTERVAL_SECS);
        if reconcile_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "reconcile_interval_secs must be at least 1".to_string(),
            ));
        }

        let probe_timeout_ms = env
            .probe_timeout_ms
            .or(file.probe_timeout_ms)
            .unwrap_or(DEFAULT_PROBE_TIMEOUT_MS);
        if probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe_timeout_ms must be at least 1".to_string(),
            ));
        }

        Ok(ServerConfig {
            listen_addr,
            database_url: env
                .database_url
                .or(file.database_url)
                .filter(|url| !url.trim().is_empty()),
            seed_file: env.seed_file.or(file.seed_file),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            probe_timeout_ms,
            probe_slow_threshold_ms: env
                .probe_slow_threshold_ms
                .or(file.probe_slow_threshold_ms)
                .unwrap_or(DEFAULT_PROBE_SLOW_THRESHOLD_MS),
            failure_threshold,
            reconcile_interval_secs,
            shard,
            notification_channels: file_config.notification_channels,
        })
    }

    pub fn probe_settings(&self) -> ProbeSettings {
        ProbeSettings {
            timeout: Duration::from_millis(self.probe_timeout_ms),
            slow_threshold: Duration::from_millis(self.probe_slow_threshold_ms),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            failure_threshold: self.failure_threshold,
            reconcile_interval: Duration::from_secs(self.reconcile_interval_secs),
            shard: self.shard,
        }
    }
}
