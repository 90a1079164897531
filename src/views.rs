//! Derived views over the store.
//!
//! The free functions are pure projections of a [`Store`]. [`ViewCache`]
//! memoizes them per store revision: a read with a revision different from the
//! cached one drops every cached view before recomputing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::Store;
use crate::task::{Task, TaskStatus};

/// Shared, immutable list of tasks in display order.
pub type TaskList = Arc<[Arc<Task>]>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub overdue: usize,
}

pub fn all_tasks(store: &Store) -> Vec<Arc<Task>> {
    store.tasks().cloned().collect()
}

pub fn tasks_with_status(store: &Store, status: TaskStatus) -> Vec<Arc<Task>> {
    store
        .tasks()
        .filter(|task| task.status == status)
        .cloned()
        .collect()
}

pub fn stats(store: &Store, now: DateTime<Utc>) -> TaskStats {
    let mut stats = TaskStats::default();
    for task in store.tasks() {
        stats.total += 1;
        match task.status {
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Done => stats.completed += 1,
            TaskStatus::Todo | TaskStatus::Review => {}
        }
        if task.is_overdue(now) {
            stats.overdue += 1;
        }
    }
    stats
}

/// Tasks matching the store's search term; all tasks when the term is blank.
pub fn filtered_tasks(store: &Store) -> Vec<Arc<Task>> {
    let term = store.search_term.trim();
    if term.is_empty() {
        return all_tasks(store);
    }
    let needle = store.search_term.to_lowercase();
    store
        .tasks()
        .filter(|task| task.matches_term(&needle))
        .cloned()
        .collect()
}

#[derive(Default)]
struct CachedViews {
    revision: Option<u64>,
    all: Option<TaskList>,
    partitions: HashMap<TaskStatus, TaskList>,
    stats: Option<TaskStats>,
    filtered: Option<TaskList>,
}

impl CachedViews {
    fn sync(&mut self, revision: u64) {
        if self.revision != Some(revision) {
            self.all = None;
            self.partitions.clear();
            self.stats = None;
            self.filtered = None;
            self.revision = Some(revision);
        }
    }
}

#[derive(Default)]
pub struct ViewCache {
    inner: Mutex<CachedViews>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self, revision: u64, store: &Store) -> TaskList {
        let mut cached = self.lock(revision);
        if let Some(list) = &cached.all {
            self.hit();
            return Arc::clone(list);
        }
        self.miss();
        let list: TaskList = all_tasks(store).into();
        cached.all = Some(Arc::clone(&list));
        list
    }

    pub fn partition(&self, revision: u64, store: &Store, status: TaskStatus) -> TaskList {
        let mut cached = self.lock(revision);
        if let Some(list) = cached.partitions.get(&status) {
            self.hit();
            return Arc::clone(list);
        }
        self.miss();
        let list: TaskList = tasks_with_status(store, status).into();
        cached.partitions.insert(status, Arc::clone(&list));
        list
    }

    /// Stats for this revision; `now` is sampled only when recomputing.
    pub fn stats<F>(&self, revision: u64, store: &Store, now: F) -> TaskStats
    where
        F: FnOnce() -> DateTime<Utc>,
    {
        let mut cached = self.lock(revision);
        if let Some(stats) = cached.stats {
            self.hit();
            return stats;
        }
        self.miss();
        let computed = stats(store, now());
        cached.stats = Some(computed);
        computed
    }

    pub fn filtered(&self, revision: u64, store: &Store) -> TaskList {
        let mut cached = self.lock(revision);
        if let Some(list) = &cached.filtered {
            self.hit();
            return Arc::clone(list);
        }
        self.miss();
        let list: TaskList = filtered_tasks(store).into();
        cached.filtered = Some(Arc::clone(&list));
        list
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn lock(&self, revision: u64) -> MutexGuard<'_, CachedViews> {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.sync(revision);
        guard
    }

    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }
}
