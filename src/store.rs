//! Normalized task store.
//!
//! `ids` fixes display order; `entities` maps each id to its task. The two are
//! kept in bijection: every id in `ids` has exactly one entity, and no entity
//! exists without its id in `ids`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Store {
    pub ids: Vec<TaskId>,
    pub entities: HashMap<TaskId, Arc<Task>>,
    pub loading: bool,
    pub error: Option<String>,
    pub search_term: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Store {
    /// Build the normalized form of an ordered task list.
    ///
    /// A repeated id keeps its first position and its last value.
    pub fn normalize(tasks: Vec<Task>) -> (Vec<TaskId>, HashMap<TaskId, Arc<Task>>) {
        let mut ids = Vec::with_capacity(tasks.len());
        let mut entities = HashMap::with_capacity(tasks.len());
        for task in tasks {
            let id = task.id.clone();
            if entities.insert(id.clone(), Arc::new(task)).is_none() {
                ids.push(id);
            }
        }
        (ids, entities)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &TaskId) -> Option<&Arc<Task>> {
        self.entities.get(id)
    }

    /// Tasks in display order.
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> + '_ {
        self.ids.iter().filter_map(|id| self.entities.get(id))
    }

    /// Check that `ids` and `entities` agree and every entity sits under its
    /// own id.
    pub fn check_integrity(&self) -> Result<(), String> {
        if self.ids.len() != self.entities.len() {
            return Err(format!(
                "{} ids but {} entities",
                self.ids.len(),
                self.entities.len()
            ));
        }
        let mut seen = HashSet::with_capacity(self.ids.len());
        for id in &self.ids {
            if !seen.insert(id) {
                return Err(format!("duplicate id {id}"));
            }
            match self.entities.get(id) {
                None => return Err(format!("id {id} has no entity")),
                Some(task) if task.id != *id => {
                    return Err(format!("entity under {id} carries id {}", task.id))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
