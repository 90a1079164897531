//! Configuration loading and management
//!
//! Handles parsing of `.taskboard.toml` from the state directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::ids::IdStrategy;
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::persistence::DEFAULT_STATE_KEY;
use crate::source::DEFAULT_FETCH_DELAY;

/// Name of the configuration file inside the state directory
pub const CONFIG_FILE: &str = ".taskboard.toml";

/// Upper bound for the simulated fetch delay
const MAX_FETCH_DELAY_MS: u64 = 60_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Durable state record configuration
    #[serde(default)]
    pub storage: StorageConfig,

    /// Initial bulk load configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Task configuration
    #[serde(default)]
    pub tasks: TasksConfig,
}

/// Storage-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Key of the state record
    #[serde(default = "default_state_key")]
    pub key: String,

    /// How long to wait for the state file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_state_key() -> String {
    DEFAULT_STATE_KEY.to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            key: default_state_key(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Bulk load configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Task document path; relative paths resolve against the state directory
    #[serde(default = "default_source_path")]
    pub path: PathBuf,

    /// Simulated network latency of the initial load
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_source_path() -> PathBuf {
    PathBuf::from("tasks.json")
}

fn default_delay_ms() -> u64 {
    DEFAULT_FETCH_DELAY.as_millis() as u64
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl SourceConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Absolute document path for a given state directory
    pub fn resolve_path(&self, state_dir: &Path) -> PathBuf {
        if self.path.is_absolute() {
            self.path.clone()
        } else {
            state_dir.join(&self.path)
        }
    }
}

/// Tasks configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksConfig {
    /// How new task ids are generated
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

impl Config {
    /// Load configuration from a `.taskboard.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a state directory, or return defaults
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.source.validate()?;
        Ok(())
    }
}

impl StorageConfig {
    fn validate(&self) -> Result<()> {
        let key = self.key.trim();
        if key.is_empty() {
            return Err(Error::InvalidConfig("storage.key cannot be empty".to_string()));
        }
        if key != self.key {
            return Err(Error::InvalidConfig(
                "storage.key cannot have surrounding whitespace".to_string(),
            ));
        }
        if !key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
        {
            return Err(Error::InvalidConfig(format!(
                "storage.key '{key}' may only contain letters, digits, '-' and '_'"
            )));
        }
        if self.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl SourceConfig {
    fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("source.path cannot be empty".to_string()));
        }
        if self.delay_ms > MAX_FETCH_DELAY_MS {
            return Err(Error::InvalidConfig(format!(
                "source.delay_ms must be <= {MAX_FETCH_DELAY_MS}"
            )));
        }
        Ok(())
    }
}
