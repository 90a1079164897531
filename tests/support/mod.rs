#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A state directory for one test, with a zero-delay config.
pub struct TestBoard {
    dir: TempDir,
}

impl TestBoard {
    pub fn init() -> Result<Self, Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let board = Self { dir };
        board.write_config("[source]\ndelay_ms = 0\n")?;
        Ok(board)
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, rel_path: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file(".taskboard.toml", contents)
    }

    pub fn write_source(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file("tasks.json", contents)
    }

    pub fn state_path(&self) -> PathBuf {
        self.dir.path().join("task-manager-state.json")
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = taskboard_cmd();
        cmd.env("TASKBOARD_DIR", self.path());
        cmd
    }

    /// Run with `--json` and return the `data` member of the envelope.
    pub fn json(&self, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let envelope: Value = serde_json::from_slice(&output)?;
        assert_eq!(envelope["status"], "success");
        Ok(envelope["data"].clone())
    }
}

pub fn taskboard_cmd() -> Command {
    let mut cmd = Command::cargo_bin("taskboard").expect("binary");
    cmd.env_remove("RUST_LOG");
    cmd
}

pub const SOURCE_DOCUMENT: &str = r#"{
  "tasks": [
    {
      "id": 1,
      "title": "Design schema",
      "description": "Tables for the board",
      "status": "in-progress",
      "priority": "high",
      "dueDate": "2020-01-10",
      "createdAt": "2020-01-01T09:00:00.000Z",
      "updatedAt": "2020-01-02T09:00:00.000Z",
      "assignees": ["ana"],
      "estimatedHours": 6
    },
    {
      "id": 2,
      "title": "Write onboarding guide",
      "description": "",
      "status": "todo",
      "priority": "low",
      "dueDate": "2999-01-01T00:00:00Z",
      "createdAt": "2020-01-01T09:00:00.000Z",
      "updatedAt": "2020-01-01T09:00:00.000Z",
      "assignees": ["bo", "cy"]
    }
  ]
}"#;
