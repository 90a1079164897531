//! Command-line interface for taskboard
//!
//! This module defines the CLI structure using clap derive macros.
//! Handlers live in submodules grouped by concern.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::board::TaskBoard;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::output::OutputOptions;
use crate::persistence::PersistenceAdapter;
use crate::source::FileTaskSource;
use crate::storage::{default_state_dir, FileStorage};
use crate::task::{Task, TaskId};

mod init;
mod task;
mod transfer;

/// taskboard - kanban task board
///
/// Tasks move through todo, in-progress, review and done. State is kept in
/// a local directory and restored on every run.
#[derive(Parser, Debug)]
#[command(name = "taskboard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// State directory (defaults to the platform data directory)
    #[arg(long, global = true, env = "TASKBOARD_DIR")]
    pub dir: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the state directory and a default config
    Init,

    /// List tasks
    List {
        /// Only tasks with this status
        #[arg(long)]
        status: Option<String>,

        /// Case-insensitive match on title, description and assignees
        #[arg(long)]
        search: Option<String>,
    },

    /// Show one task
    Show {
        /// Task ID
        id: String,
    },

    /// Create a task
    Add {
        /// Task title
        title: String,

        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Initial status
        #[arg(long, default_value = "todo")]
        status: String,

        /// Due date (e.g. 2024-05-01 or 2024-05-01T17:00:00Z)
        #[arg(long)]
        due: String,

        /// Assignees; repeat or separate with commas
        #[arg(short, long = "assignee")]
        assignees: Vec<String>,

        /// Estimated hours
        #[arg(long)]
        estimate: Option<f64>,
    },

    /// Edit fields of a task
    Update {
        /// Task ID
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        due: Option<String>,

        /// Replace assignees; repeat or separate with commas
        #[arg(short, long = "assignee")]
        assignees: Vec<String>,

        /// Remove all assignees
        #[arg(long, conflicts_with = "assignees")]
        clear_assignees: bool,

        /// Estimated hours
        #[arg(long)]
        estimate: Option<f64>,

        /// Hours actually spent
        #[arg(long)]
        actual: Option<f64>,
    },

    /// Move a task to another column
    Move {
        /// Task ID
        id: String,

        /// Target status: todo, in-progress, review, done
        status: String,
    },

    /// Flip a task between done and todo
    Toggle {
        /// Task ID
        id: String,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: String,
    },

    /// Board statistics
    Stats,

    /// Export all tasks as JSON
    Export {
        /// File or directory to write; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace all tasks with the contents of a JSON file
    Import {
        /// File holding a task array or a `{ "tasks": [...] }` document
        file: PathBuf,
    },

    /// Reload tasks from the configured source
    Refresh,
}

/// Global flags every handler needs
#[derive(Debug, Clone)]
pub(crate) struct Context {
    pub dir: PathBuf,
    pub output: OutputOptions,
}

/// A board restored from the state directory, with the runtime that drives
/// its async loads.
pub(crate) struct Session {
    pub board: TaskBoard<FileTaskSource>,
    pub runtime: tokio::runtime::Runtime,
}

impl Context {
    /// Restore the board, running the initial load when nothing was persisted.
    pub fn open(&self) -> Result<Session> {
        let mut session = self.open_without_initialize()?;
        session.runtime.block_on(session.board.initialize());
        Ok(session)
    }

    /// Build the board without restoring or fetching anything.
    pub fn open_without_initialize(&self) -> Result<Session> {
        let config = Config::load_from_dir(&self.dir);
        let storage =
            FileStorage::new(&self.dir).with_lock_timeout(config.storage.lock_timeout_ms);
        let persistence =
            PersistenceAdapter::with_key(Arc::new(storage), config.storage.key.clone());
        let source = FileTaskSource::new(config.source.resolve_path(&self.dir))
            .with_delay(config.source.delay());
        let board =
            TaskBoard::new(source, persistence).with_id_strategy(config.tasks.id_strategy);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Session { board, runtime })
    }
}

impl Session {
    pub fn require_task(&self, raw_id: &str) -> Result<Arc<Task>> {
        let id = TaskId::from(raw_id.trim());
        self.board
            .task(&id)
            .ok_or_else(|| Error::TaskNotFound(raw_id.to_string()))
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let ctx = Context {
            dir: self.dir.unwrap_or_else(default_state_dir),
            output: OutputOptions {
                json: self.json,
                quiet: self.quiet,
            },
        };

        match self.command {
            Commands::Init => init::run(&ctx),
            Commands::List { status, search } => task::run_list(&ctx, status, search),
            Commands::Show { id } => task::run_show(&ctx, &id),
            Commands::Add {
                title,
                description,
                priority,
                status,
                due,
                assignees,
                estimate,
            } => task::run_add(
                &ctx,
                task::AddOptions {
                    title,
                    description,
                    priority,
                    status,
                    due,
                    assignees,
                    estimate,
                },
            ),
            Commands::Update {
                id,
                title,
                description,
                priority,
                status,
                due,
                assignees,
                clear_assignees,
                estimate,
                actual,
            } => task::run_update(
                &ctx,
                task::UpdateOptions {
                    id,
                    title,
                    description,
                    priority,
                    status,
                    due,
                    assignees,
                    clear_assignees,
                    estimate,
                    actual,
                },
            ),
            Commands::Move { id, status } => task::run_move(&ctx, &id, &status),
            Commands::Toggle { id } => task::run_toggle(&ctx, &id),
            Commands::Rm { id } => task::run_rm(&ctx, &id),
            Commands::Stats => task::run_stats(&ctx),
            Commands::Export { output } => transfer::run_export(&ctx, output),
            Commands::Import { file } => transfer::run_import(&ctx, &file),
            Commands::Refresh => transfer::run_refresh(&ctx),
        }
    }
}
