//! Snapshot and hydrate the board state.
//!
//! The whole store, scalar flags included, is serialized as one JSON record
//! under a fixed key. Reading it back rebuilds every timestamp from its text
//! form (see [`crate::timestamp`]) and re-checks that `ids` and `entities`
//! agree. Neither direction ever fails past this module: problems are logged
//! and the caller keeps its in-memory state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::storage::StateStorage;
use crate::store::Store;
use crate::task::{Task, TaskId};

/// Storage key of the board state record
pub const DEFAULT_STATE_KEY: &str = "task-manager-state";

const STATE_SCHEMA_VERSION: &str = "taskboard.state.v1";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    schema_version: Option<String>,
    entities: BTreeMap<String, Task>,
    ids: Vec<TaskId>,
    #[serde(default)]
    loading: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    search_term: String,
    #[serde(default, with = "crate::timestamp::option")]
    last_updated: Option<DateTime<Utc>>,
}

impl PersistedStore {
    fn from_store(store: &Store) -> Self {
        Self {
            schema_version: Some(STATE_SCHEMA_VERSION.to_string()),
            entities: store
                .entities
                .iter()
                .map(|(id, task)| (id.to_string(), Task::clone(task)))
                .collect(),
            ids: store.ids.clone(),
            loading: store.loading,
            error: store.error.clone(),
            search_term: store.search_term.clone(),
            last_updated: store.last_updated,
        }
    }

    fn into_store(self, key: &str) -> Result<Store> {
        let corrupt = |message: String| Error::Storage {
            key: key.to_string(),
            message,
        };

        if let Some(version) = &self.schema_version {
            if version != STATE_SCHEMA_VERSION {
                return Err(corrupt(format!("unsupported schema version {version}")));
            }
        }

        let mut entities = HashMap::with_capacity(self.entities.len());
        for (raw_id, task) in self.entities {
            let id = TaskId::new(raw_id);
            if task.id != id {
                return Err(corrupt(format!("entity under {id} carries id {}", task.id)));
            }
            entities.insert(id, Arc::new(task));
        }

        let store = Store {
            ids: self.ids,
            entities,
            loading: self.loading,
            error: self.error,
            search_term: self.search_term,
            last_updated: self.last_updated,
        };
        store.check_integrity().map_err(corrupt)?;
        Ok(store)
    }
}

/// Serialize a store to its persisted text form.
pub fn encode(store: &Store) -> Result<String> {
    Ok(serde_json::to_string(&PersistedStore::from_store(store))?)
}

/// Parse a persisted record back into a store.
pub fn decode(raw: &str, key: &str) -> Result<Store> {
    let persisted: PersistedStore = serde_json::from_str(raw)?;
    persisted.into_store(key)
}

/// Reads and writes the board state record in a [`StateStorage`].
#[derive(Clone)]
pub struct PersistenceAdapter {
    storage: Arc<dyn StateStorage>,
    key: String,
}

impl PersistenceAdapter {
    pub fn new(storage: Arc<dyn StateStorage>) -> Self {
        Self::with_key(storage, DEFAULT_STATE_KEY)
    }

    pub fn with_key(storage: Arc<dyn StateStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &Arc<dyn StateStorage> {
        &self.storage
    }

    /// Write the store; failures are logged and reported as `false`.
    pub fn snapshot(&self, store: &Store) -> bool {
        match self.try_snapshot(store) {
            Ok(()) => {
                debug!(key = %self.key, tasks = store.len(), "state snapshot written");
                true
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to save state to storage");
                false
            }
        }
    }

    pub fn try_snapshot(&self, store: &Store) -> Result<()> {
        let encoded = encode(store)?;
        self.storage.write(&self.key, &encoded)
    }

    /// Read the store back; `None` when there is no usable record.
    pub fn hydrate(&self) -> Option<Store> {
        match self.try_hydrate() {
            Ok(Some(store)) => {
                info!(key = %self.key, tasks = store.len(), "state restored from storage");
                Some(store)
            }
            Ok(None) => {
                debug!(key = %self.key, "no persisted state");
                None
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "failed to load from storage");
                None
            }
        }
    }

    pub fn try_hydrate(&self) -> Result<Option<Store>> {
        let Some(raw) = self.storage.read(&self.key)? else {
            return Ok(None);
        };
        decode(&raw, &self.key).map(Some)
    }

    /// Drop the persisted record.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(&self.key)
    }
}

impl std::fmt::Debug for PersistenceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceAdapter")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}
