//! taskboard - task board state library
//!
//! A kanban-style task board whose state lives in one immutable [`Store`]
//! value. Every change is a [`Command`] applied by a pure reducer; derived
//! views are memoized per store revision, and the store is snapshotted to a
//! local record after task data changes.
//!
//! # Core Concepts
//!
//! - **Store**: ordered task ids plus an id → task map, with loading, error
//!   and search flags
//! - **Commands**: the closed set of mutations and effects
//! - **Views**: status columns, statistics, and search results
//! - **Persistence**: one JSON record restored on start-up
//!
//! # Module Organization
//!
//! - `board`: The [`TaskBoard`] facade that owns the store
//! - `cli`: Command-line interface using clap
//! - `clock`: Injectable time source
//! - `command`: Command enum
//! - `config`: Configuration loading from `.taskboard.toml`
//! - `error`: Error types and result aliases
//! - `ids`: Task id generation strategies
//! - `lock`: File locking and atomic writes
//! - `output`: JSON and human output for the CLI
//! - `persistence`: Snapshot and hydrate of the store
//! - `reducer`: State transitions
//! - `source`: Async bulk task sources
//! - `storage`: Durable key/value backends
//! - `store`: Normalized board state
//! - `task`: Task entity model
//! - `timestamp`: Timestamp parsing and formatting
//! - `views`: Derived views and their cache
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use taskboard::{
//!     MemoryStorage, MemoryTaskSource, NewTask, PersistenceAdapter, TaskBoard, TaskStatus,
//! };
//!
//! let storage = Arc::new(MemoryStorage::new());
//! let mut board = TaskBoard::new(MemoryTaskSource::new(vec![]), PersistenceAdapter::new(storage));
//!
//! let id = board
//!     .create_task(NewTask::new("Write docs", Utc::now() + Duration::days(2)))
//!     .unwrap();
//! board.update_task_status(id.clone(), TaskStatus::InProgress);
//!
//! assert_eq!(board.in_progress_tasks()[0].id, id);
//! assert_eq!(board.stats().in_progress, 1);
//! ```

pub mod board;
pub mod cli;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod ids;
pub mod lock;
pub mod output;
pub mod persistence;
pub mod reducer;
pub mod source;
pub mod storage;
pub mod store;
pub mod task;
pub mod timestamp;
pub mod views;

pub use board::{BoardSnapshot, TaskBoard};
pub use command::Command;
pub use error::{Error, Result};
pub use persistence::PersistenceAdapter;
pub use source::{FileTaskSource, MemoryTaskSource, TaskSource};
pub use storage::{FileStorage, MemoryStorage, StateStorage};
pub use store::Store;
pub use task::{NewTask, Task, TaskId, TaskPatch, TaskPriority, TaskStatus};
