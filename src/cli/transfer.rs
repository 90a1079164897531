//! Export, import and refresh: commands that move whole task lists.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::board::export_file_name;
use crate::cli::Context;
use crate::error::{Error, Result};
use crate::lock::write_atomic;
use crate::output::{emit_success, HumanOutput};
use crate::task::Task;

#[derive(Serialize)]
struct ExportOutput<'a> {
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tasks: Option<Vec<&'a Task>>,
}

#[derive(Serialize)]
struct LoadOutput {
    total: usize,
}

pub fn run_export(ctx: &Context, output: Option<PathBuf>) -> Result<()> {
    let session = ctx.open()?;
    let exported = session.board.export_tasks()?;
    let tasks = session.board.tasks();

    let Some(target) = output else {
        if ctx.output.json {
            let report = ExportOutput {
                total: tasks.len(),
                path: None,
                tasks: Some(tasks.iter().map(AsRef::as_ref).collect()),
            };
            return emit_success(ctx.output, "export", &report, None);
        }
        println!("{exported}");
        return Ok(());
    };

    let path = resolve_export_path(&target, &session.board.now());
    write_atomic(&path, exported.as_bytes())?;
    info!(path = %path.display(), tasks = tasks.len(), "tasks exported");

    let report = ExportOutput {
        total: tasks.len(),
        path: Some(path.clone()),
        tasks: None,
    };
    let mut human = HumanOutput::new("Tasks exported");
    human.push_summary("Total", tasks.len().to_string());
    human.push_summary("Path", path.display().to_string());

    emit_success(ctx.output, "export", &report, Some(&human))
}

pub fn run_import(ctx: &Context, file: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(file)?;
    let mut session = ctx.open()?;
    session.board.import_json(&raw)?;

    let report = LoadOutput {
        total: session.board.tasks().len(),
    };
    let mut human = HumanOutput::new("Tasks imported");
    human.push_summary("Total", report.total.to_string());
    human.push_summary("From", file.display().to_string());

    emit_success(ctx.output, "import", &report, Some(&human))
}

pub fn run_refresh(ctx: &Context) -> Result<()> {
    // Hydrate only: `open` would fetch once more for an empty board.
    let mut session = ctx.open_without_initialize()?;
    session.board.hydrate();
    session.runtime.block_on(session.board.refresh());
    if let Some(error) = session.board.error() {
        return Err(Error::LoadFailed(error.to_string()));
    }

    let report = LoadOutput {
        total: session.board.tasks().len(),
    };
    let mut human = HumanOutput::new("Tasks reloaded");
    human.push_summary("Total", report.total.to_string());

    emit_success(ctx.output, "refresh", &report, Some(&human))
}

/// Directories get a dated backup file name.
fn resolve_export_path(target: &Path, now: &chrono::DateTime<chrono::Utc>) -> PathBuf {
    if target.is_dir() {
        target.join(export_file_name(*now))
    } else {
        target.to_path_buf()
    }
}
