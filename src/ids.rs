//! Task id generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::error::{Error, Result};
use crate::store::Store;
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random, time-ordered ULID token.
    #[default]
    Ulid,
    /// One more than the largest numeric id on the board, starting at 1.
    Sequential,
}

impl IdStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            IdStrategy::Ulid => "ulid",
            IdStrategy::Sequential => "sequential",
        }
    }

    /// Produce an id not present in `store`.
    pub fn next_id(self, store: &Store) -> TaskId {
        match self {
            IdStrategy::Sequential => TaskId::from(next_sequential(store)),
            IdStrategy::Ulid => loop {
                let candidate = TaskId::new(Ulid::new().to_string().to_lowercase());
                if !store.contains(&candidate) {
                    break candidate;
                }
            },
        }
    }
}

/// Ids that are not plain integers do not take part in the maximum.
fn next_sequential(store: &Store) -> u64 {
    store
        .ids
        .iter()
        .filter_map(TaskId::as_number)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdStrategy {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "ulid" => Ok(IdStrategy::Ulid),
            "sequential" => Ok(IdStrategy::Sequential),
            other => Err(Error::InvalidConfig(format!(
                "tasks.id_strategy: unknown strategy '{other}' (expected ulid|sequential)"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::NewTask;
    use chrono::Utc;

    fn store_with(ids: &[&str]) -> Store {
        let tasks = ids
            .iter()
            .map(|id| NewTask::new("t", Utc::now()).into_task(TaskId::from(*id), Utc::now()))
            .collect();
        let (ids, entities) = Store::normalize(tasks);
        Store {
            ids,
            entities,
            ..Store::default()
        }
    }

    #[test]
    fn sequential_starts_at_one() {
        assert_eq!(IdStrategy::Sequential.next_id(&Store::default()).as_str(), "1");
    }

    #[test]
    fn sequential_is_max_plus_one_ignoring_opaque_ids() {
        let store = store_with(&["3", "10", "01hqabc", "7"]);
        assert_eq!(IdStrategy::Sequential.next_id(&store).as_str(), "11");
    }

    #[test]
    fn ulid_ids_are_unique_tokens() {
        let store = Store::default();
        let a = IdStrategy::Ulid.next_id(&store);
        let b = IdStrategy::Ulid.next_id(&store);
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 26);
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!("Sequential".parse::<IdStrategy>().unwrap(), IdStrategy::Sequential);
        assert!("uuid".parse::<IdStrategy>().is_err());
    }
}
