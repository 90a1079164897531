//! Bulk task sources.
//!
//! The board's initial load reads a `{ "tasks": [...] }` document. Dates in
//! the document are text and are parsed into timestamps while decoding.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::task::{validate_tasks, Task, TaskDocument};

/// Default artificial latency of a bulk fetch
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(500);

/// Something that can produce the full task list asynchronously.
pub trait TaskSource: Send + Sync {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Task>>> + Send;
}

/// Parse and validate a bulk load document.
pub fn parse_document(raw: &str) -> Result<Vec<Task>> {
    let document: TaskDocument = serde_json::from_str(raw)?;
    validate_tasks(&document.tasks)?;
    Ok(document.tasks)
}

/// Reads a JSON task document from disk after a simulated network delay.
#[derive(Debug, Clone)]
pub struct FileTaskSource {
    path: PathBuf,
    delay: Duration,
}

impl FileTaskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delay: DEFAULT_FETCH_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for FileTaskSource {
    async fn fetch(&self) -> Result<Vec<Task>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        debug!(path = %self.path.display(), "fetching task document");
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|err| {
            Error::LoadFailed(format!("{}: {err}", self.path.display()))
        })?;
        parse_document(&raw)
    }
}

/// In-process source returning a fixed result.
#[derive(Debug)]
pub struct MemoryTaskSource {
    result: std::result::Result<Vec<Task>, String>,
    delay: Duration,
    fetches: AtomicUsize,
}

impl MemoryTaskSource {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            result: Ok(tasks),
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
            delay: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of completed or attempted fetches.
    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl TaskSource for MemoryTaskSource {
    async fn fetch(&self) -> Result<Vec<Task>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.clone().map_err(Error::LoadFailed)
    }
}

impl<S: TaskSource> TaskSource for std::sync::Arc<S> {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Task>>> + Send {
        S::fetch(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"{
        "tasks": [
            {
                "id": 1,
                "title": "Set up CI",
                "description": "GitHub Actions",
                "status": "done",
                "priority": "high",
                "dueDate": "2024-01-10",
                "createdAt": "2024-01-01T10:00:00.000Z",
                "updatedAt": "2024-01-05T10:00:00.000Z",
                "assignees": ["ana"],
                "estimatedHours": 4,
                "actualHours": 5
            },
            {
                "id": 2,
                "title": "Write docs",
                "status": "todo",
                "dueDate": "2024-02-01T00:00:00Z",
                "createdAt": "2024-01-02T10:00:00Z",
                "updatedAt": "2024-01-02T10:00:00Z"
            }
        ]
    }"#;

    #[test]
    fn parse_document_normalizes_dates_and_defaults() {
        let tasks = parse_document(DOCUMENT).unwrap();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id.as_str(), "1");
        assert_eq!(tasks[0].actual_hours, Some(5.0));
        assert_eq!(tasks[1].description, "");
        assert_eq!(tasks[1].assignees, None);
        assert_eq!(
            tasks[0].due_date.to_rfc3339(),
            "2024-01-10T00:00:00+00:00"
        );
    }

    #[test]
    fn parse_document_rejects_blank_titles() {
        let raw = DOCUMENT.replace("Write docs", " ");
        assert!(matches!(
            parse_document(&raw),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn file_source_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, DOCUMENT).unwrap();

        let source = FileTaskSource::new(&path).with_delay(Duration::ZERO);
        let tasks = source.fetch().await.unwrap();
        assert_eq!(tasks.len(), 2);
    }

    #[tokio::test]
    async fn file_source_missing_file_is_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileTaskSource::new(dir.path().join("absent.json")).with_delay(Duration::ZERO);
        assert!(matches!(source.fetch().await, Err(Error::LoadFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn memory_source_waits_for_delay() {
        let source = MemoryTaskSource::failing("offline").with_delay(Duration::from_millis(500));
        let started = tokio::time::Instant::now();
        let result = source.fetch().await;
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(matches!(result, Err(Error::LoadFailed(message)) if message == "offline"));
        assert_eq!(source.fetches(), 1);
    }
}
