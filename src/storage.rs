//! Durable key/value storage for the board state record
//!
//! The board keeps one textual record under a fixed key. Two backends:
//!
//! - [`FileStorage`]: one file per key inside a state directory, written
//!   atomically under an advisory lock
//! - [`MemoryStorage`]: in-process map with an optional byte quota
//!
//! # Directory Structure
//!
//! ```text
//! <state dir>/
//!   task-manager-state.json        # Serialized board state
//!   task-manager-state.json.lock   # Advisory lock for writers
//!   .taskboard.toml                # Optional configuration
//! ```

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use directories::ProjectDirs;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};

/// Directory used when no platform data directory is available
pub const FALLBACK_DIR: &str = ".taskboard";

/// Extension for state records on disk
const RECORD_EXTENSION: &str = "json";

/// Textual record storage keyed by name.
pub trait StateStorage: Send + Sync {
    /// Read the record under `key`; `Ok(None)` when absent.
    fn read(&self, key: &str) -> Result<Option<String>>;

    /// Replace the record under `key`.
    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the record under `key`; absent keys are not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Platform data directory for taskboard state, or `.taskboard` in the
/// current directory.
pub fn default_state_dir() -> PathBuf {
    ProjectDirs::from("", "", "taskboard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(FALLBACK_DIR))
}

fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && !key.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(Error::Storage {
            key: key.to_string(),
            message: "keys may only contain letters, digits, '-', '_' and '.'".to_string(),
        })
    }
}

/// File-backed storage rooted at a state directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    lock_timeout_ms: u64,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path to the state directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{RECORD_EXTENSION}"))
    }

    /// Create the state directory if needed
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

impl StateStorage for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.record_path(key);
        if !path.exists() {
            return Ok(None);
        }
        lock::read_record(&path, self.lock_timeout_ms)
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.init()?;
        lock::write_record(&self.record_path(key), value.as_bytes(), self.lock_timeout_ms)
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        match fs::remove_file(self.record_path(key)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::Io(err)),
        }
    }
}

/// In-process storage, optionally capped at a total byte quota
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push the total stored bytes past `bytes`.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            quota_bytes: Some(bytes),
        }
    }

    /// Seed a record, bypassing the quota.
    pub fn with_record(self, key: &str, value: impl Into<String>) -> Self {
        self.records_mut().insert(key.to_string(), value.into());
        self
    }

    fn records_mut(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl StateStorage for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records_mut().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let mut records = self.records_mut();
        if let Some(quota) = self.quota_bytes {
            let others: usize = records
                .iter()
                .filter(|(name, _)| name.as_str() != key)
                .map(|(name, content)| name.len() + content.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(Error::Storage {
                    key: key.to_string(),
                    message: format!("quota of {quota} bytes exceeded"),
                });
            }
        }
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.records_mut().remove(key);
        Ok(())
    }
}
