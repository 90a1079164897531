//! taskboard init command implementation
//!
//! Creates the state directory, a default config, and an empty task source.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::Context;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::lock::write_atomic;
use crate::output::{emit_success, HumanOutput};
use crate::task::TaskDocument;

#[derive(Serialize)]
struct InitReport {
    dir: PathBuf,
    created: InitCreated,
}

#[derive(Serialize)]
struct InitCreated {
    dir: bool,
    config: bool,
    source: bool,
}

pub fn run(ctx: &Context) -> Result<()> {
    let created_dir = ensure_dir(&ctx.dir)?;
    let created_config = ensure_config(&ctx.dir)?;
    let config = Config::load_from_dir(&ctx.dir);
    let source_path = config.source.resolve_path(&ctx.dir);
    let created_source = ensure_source(&source_path)?;

    let report = InitReport {
        dir: ctx.dir.clone(),
        created: InitCreated {
            dir: created_dir,
            config: created_config,
            source: created_source,
        },
    };

    let mut created_items = Vec::new();
    if created_dir {
        created_items.push(ctx.dir.display().to_string());
    }
    if created_config {
        created_items.push(CONFIG_FILE.to_string());
    }
    if created_source {
        created_items.push(source_path.display().to_string());
    }

    let header = if created_items.is_empty() {
        "taskboard init: nothing to do"
    } else {
        "taskboard init: initialized board"
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("dir", ctx.dir.display().to_string());
    human.push_summary(
        "created",
        if created_items.is_empty() {
            "none".to_string()
        } else {
            created_items.join(", ")
        },
    );
    human.push_next_step("taskboard add <title> --due <date>");

    emit_success(ctx.output, "init", &report, Some(&human))
}

fn ensure_config(dir: &Path) -> Result<bool> {
    let config_path = dir.join(CONFIG_FILE);
    if config_path.exists() {
        if !config_path.is_file() {
            return Err(Error::InvalidConfig(format!(
                "{CONFIG_FILE} exists but is not a file: {}",
                config_path.display()
            )));
        }
        return Ok(false);
    }

    Config::default().save(&config_path)?;
    Ok(true)
}

fn ensure_source(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    let empty = serde_json::to_string_pretty(&TaskDocument::default())?;
    write_atomic(path, empty.as_bytes())?;
    Ok(true)
}

fn ensure_dir(path: &Path) -> Result<bool> {
    if path.exists() {
        if !path.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "expected directory at {}",
                path.display()
            )));
        }
        return Ok(false);
    }

    std::fs::create_dir_all(path)?;
    Ok(true)
}
