//! HostConfig - 設定
//!
//! JSON file with per-field defaults, then `REACTHOST_*` environment overrides.
//!
//! ```json
//! { "state_path": "data/apps.json", "sweep_interval_secs": 10, "idle_timeout_secs": 900 }
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::host::DEFAULT_STATE_PATH;

pub const ENV_STATE_PATH: &str = "REACTHOST_STATE_PATH";
pub const ENV_SWEEP_INTERVAL_SECS: &str = "REACTHOST_SWEEP_INTERVAL_SECS";
pub const ENV_IDLE_TIMEOUT_SECS: &str = "REACTHOST_IDLE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    /// Where `FileStorage` keeps the snapshot.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Idle timeout for apps started by the host binary. 0 disables it.
    #[serde(default)]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            sweep_interval_secs: default_sweep_interval_secs(),
            idle_timeout_secs: 0,
        }
    }
}

impl HostConfig {
    /// Read a config file. A missing file means all defaults.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ConfigError::Io(e)),
        };
        Ok(serde_json::from_str(&contents)?)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(self) -> Result<Self, ConfigError> {
        self.apply_lookup(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (the environment, or a map in tests).
    pub fn apply_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(path) = lookup(ENV_STATE_PATH).filter(|p| !p.is_empty()) {
            self.state_path = PathBuf::from(path);
        }
        if let Some(value) = lookup(ENV_SWEEP_INTERVAL_SECS) {
            self.sweep_interval_secs = parse_secs(ENV_SWEEP_INTERVAL_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_IDLE_TIMEOUT_SECS) {
            self.idle_timeout_secs = parse_secs(ENV_IDLE_TIMEOUT_SECS, value)?;
        }
        Ok(self)
    }

    /// Never shorter than one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn parse_secs(key: &'static str, value: String) -> Result<u64, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue { key, value })
}

fn default_state_path() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_PATH)
}

fn default_sweep_interval_secs() -> u64 {
    10
}
