//! State transitions.
//!
//! `reduce` is the only writer of [`Store`] values. It never mutates its input:
//! a transition clones the store shell (entities are shared through `Arc`)
//! and replaces the touched parts. Transitions that change nothing hand back
//! the same `Arc`, so callers can detect no-ops with `Arc::ptr_eq`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::command::Command;
use crate::store::Store;
use crate::task::{TaskId, TaskPatch};

/// Compute the next store for `command`, with `now` as the mutation instant.
pub fn reduce(state: &Arc<Store>, command: Command, now: DateTime<Utc>) -> Arc<Store> {
    match command {
        Command::LoadTasks => Arc::new(Store {
            loading: true,
            error: None,
            ..Store::clone(state)
        }),

        Command::LoadTasksSuccess(tasks) => {
            let (ids, entities) = Store::normalize(tasks);
            Arc::new(Store {
                ids,
                entities,
                loading: false,
                error: None,
                last_updated: Some(now),
                ..Store::clone(state)
            })
        }

        Command::LoadTasksFailure(message) | Command::SetError(message) => Arc::new(Store {
            loading: false,
            error: Some(message),
            ..Store::clone(state)
        }),

        Command::CreateTask(task) => {
            let mut next = Store::clone(state);
            let id = task.id.clone();
            // Re-creating an existing id replaces it in place.
            if next.entities.insert(id.clone(), Arc::new(task)).is_none() {
                next.ids.push(id);
            }
            next.last_updated = Some(now);
            Arc::new(next)
        }

        Command::UpdateTask { id, patch } => update_entity(state, &id, &patch, now),

        Command::UpdateTaskStatus { id, status } => {
            update_entity(state, &id, &TaskPatch::status(status), now)
        }

        Command::DeleteTask(id) => delete_entity(state, &id, now),

        Command::SearchTasks(term) => Arc::new(Store {
            search_term: term,
            ..Store::clone(state)
        }),

        Command::SetLoading(loading) => Arc::new(Store {
            loading,
            ..Store::clone(state)
        }),

        Command::ClearError => {
            if state.error.is_none() {
                return Arc::clone(state);
            }
            Arc::new(Store {
                error: None,
                ..Store::clone(state)
            })
        }

        // Effects handled by the board; the store itself is unchanged.
        Command::Hydrate | Command::Persist => Arc::clone(state),
    }
}

fn update_entity(
    state: &Arc<Store>,
    id: &TaskId,
    patch: &TaskPatch,
    now: DateTime<Utc>,
) -> Arc<Store> {
    let Some(existing) = state.entities.get(id) else {
        return Arc::clone(state);
    };

    let updated = patch.apply_to(existing, now);
    let mut next = Store::clone(state);
    next.entities.insert(id.clone(), Arc::new(updated));
    next.last_updated = Some(now);
    Arc::new(next)
}

fn delete_entity(state: &Arc<Store>, id: &TaskId, now: DateTime<Utc>) -> Arc<Store> {
    if !state.entities.contains_key(id) {
        return Arc::clone(state);
    }

    let mut next = Store::clone(state);
    next.entities.remove(id);
    if let Some(pos) = next.ids.iter().position(|candidate| candidate == id) {
        next.ids.remove(pos);
    }
    next.last_updated = Some(now);
    Arc::new(next)
}
