//! The task board facade.
//!
//! [`TaskBoard`] owns the current [`Store`] and is the single place commands
//! are applied. Each dispatch runs the reducer, swaps the store when it
//! changed, bumps the revision that keys the view cache, and writes a
//! snapshot after task data changes. Hydrate and persist are handled here
//! rather than in the reducer since they touch storage.

use std::sync::Arc;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::command::Command;
use crate::error::Result;
use crate::ids::IdStrategy;
use crate::persistence::PersistenceAdapter;
use crate::reducer::reduce;
use crate::source::TaskSource;
use crate::store::Store;
use crate::task::{validate_tasks, NewTask, Task, TaskDocument, TaskId, TaskPatch, TaskStatus};
use crate::views::{TaskList, TaskStats, ViewCache};

/// Error recorded on the board when the bulk load fails.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load initial tasks";

/// Point-in-time view of the board for consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub tasks: Vec<Task>,
    pub loading: bool,
    pub error: Option<String>,
    #[serde(with = "crate::timestamp::option")]
    pub last_updated: Option<DateTime<Utc>>,
    pub stats: TaskStats,
}

/// Backup file name for an export taken at `now`.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("tasks-backup-{}.json", now.format("%Y-%m-%d"))
}

/// Imports take either a bare task array (the export format) or a bulk load
/// document.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    List(Vec<Task>),
    Document(TaskDocument),
}

pub struct TaskBoard<S> {
    state: Arc<Store>,
    revision: u64,
    views: ViewCache,
    persistence: PersistenceAdapter,
    source: S,
    id_strategy: IdStrategy,
    clock: Arc<dyn Clock>,
}

impl<S: TaskSource> TaskBoard<S> {
    pub fn new(source: S, persistence: PersistenceAdapter) -> Self {
        Self {
            state: Arc::new(Store::default()),
            revision: 0,
            views: ViewCache::new(),
            persistence,
            source,
            id_strategy: IdStrategy::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    /// Apply one command.
    pub fn dispatch(&mut self, command: Command) {
        debug!(command = command.name(), revision = self.revision, "dispatch");
        match command {
            Command::Hydrate => {
                if let Some(restored) = self.persistence.hydrate() {
                    self.replace(Arc::new(restored));
                }
            }
            Command::Persist => {
                self.persistence.snapshot(&self.state);
            }
            command => {
                let persists = command.persists();
                let next = reduce(&self.state, command, self.now());
                if Arc::ptr_eq(&next, &self.state) {
                    return;
                }
                self.replace(next);
                if persists {
                    self.persistence.snapshot(&self.state);
                }
            }
        }
    }

    fn replace(&mut self, next: Arc<Store>) {
        self.state = next;
        self.revision += 1;
    }

    /// Restore persisted state, and fall back to the bulk load when nothing
    /// was restored.
    pub async fn initialize(&mut self) {
        self.dispatch(Command::Hydrate);
        if self.state.entities.is_empty() {
            self.load_initial_tasks().await;
        } else {
            debug!(tasks = self.state.len(), "skipping initial load");
        }
    }

    /// Fetch the full task list and replace the board with it.
    pub async fn load_initial_tasks(&mut self) {
        self.dispatch(Command::SetLoading(true));
        self.dispatch(Command::ClearError);
        let fetched = self.source.fetch().await.and_then(|tasks| {
            validate_tasks(&tasks)?;
            Ok(tasks)
        });
        match fetched {
            Ok(tasks) => {
                info!(tasks = tasks.len(), "initial tasks loaded");
                let tasks = tasks.into_iter().map(Task::normalized).collect();
                self.dispatch(Command::LoadTasksSuccess(tasks));
            }
            Err(err) => {
                warn!(error = %err, "initial task load failed");
                self.dispatch(Command::LoadTasksFailure(LOAD_FAILED_MESSAGE.to_string()));
            }
        }
    }

    pub async fn refresh(&mut self) {
        self.load_initial_tasks().await;
    }

    /// Create a task, returning its newly assigned id.
    pub fn create_task(&mut self, draft: NewTask) -> Result<TaskId> {
        draft.validate()?;
        let id = self.id_strategy.next_id(&self.state);
        let task = draft.into_task(id.clone(), self.now());
        self.dispatch(Command::CreateTask(task));
        Ok(id)
    }

    /// Merge `patch` into the task; unknown ids are ignored.
    ///
    /// An empty patch is a no-op: `updated_at` is left alone and nothing is
    /// persisted.
    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<()> {
        patch.validate()?;
        if patch.is_empty() {
            return Ok(());
        }
        self.dispatch(Command::UpdateTask { id, patch });
        Ok(())
    }

    pub fn update_task_status(&mut self, id: TaskId, status: TaskStatus) {
        self.dispatch(Command::UpdateTaskStatus { id, status });
    }

    pub fn delete_task(&mut self, id: TaskId) {
        self.dispatch(Command::DeleteTask(id));
    }

    pub fn search_tasks(&mut self, term: impl Into<String>) {
        self.dispatch(Command::SearchTasks(term.into()));
    }

    pub fn clear_search(&mut self) {
        self.dispatch(Command::SearchTasks(String::new()));
    }

    pub fn clear_error(&mut self) {
        self.dispatch(Command::ClearError);
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.dispatch(Command::SetError(message.into()));
    }

    pub fn hydrate(&mut self) {
        self.dispatch(Command::Hydrate);
    }

    pub fn persist(&mut self) {
        self.dispatch(Command::Persist);
    }

    /// Pretty-printed JSON array of the tasks in display order.
    pub fn export_tasks(&self) -> Result<String> {
        let tasks = self.tasks();
        let ordered: Vec<&Task> = tasks.iter().map(AsRef::as_ref).collect();
        Ok(serde_json::to_string_pretty(&ordered)?)
    }

    /// Replace every task on the board.
    pub fn import_tasks(&mut self, tasks: Vec<Task>) -> Result<()> {
        validate_tasks(&tasks)?;
        info!(tasks = tasks.len(), "importing tasks");
        let tasks = tasks.into_iter().map(Task::normalized).collect();
        self.dispatch(Command::LoadTasksSuccess(tasks));
        Ok(())
    }

    pub fn import_json(&mut self, raw: &str) -> Result<()> {
        let tasks = match serde_json::from_str(raw)? {
            ImportPayload::List(tasks) => tasks,
            ImportPayload::Document(document) => document.tasks,
        };
        self.import_tasks(tasks)
    }

    pub fn tasks(&self) -> TaskList {
        self.views.tasks(self.revision, &self.state)
    }

    pub fn tasks_with_status(&self, status: TaskStatus) -> TaskList {
        self.views.partition(self.revision, &self.state, status)
    }

    pub fn todo_tasks(&self) -> TaskList {
        self.tasks_with_status(TaskStatus::Todo)
    }

    pub fn in_progress_tasks(&self) -> TaskList {
        self.tasks_with_status(TaskStatus::InProgress)
    }

    pub fn review_tasks(&self) -> TaskList {
        self.tasks_with_status(TaskStatus::Review)
    }

    pub fn done_tasks(&self) -> TaskList {
        self.tasks_with_status(TaskStatus::Done)
    }

    pub fn stats(&self) -> TaskStats {
        self.views
            .stats(self.revision, &self.state, || self.now())
    }

    pub fn filtered_tasks(&self) -> TaskList {
        self.views.filtered(self.revision, &self.state)
    }

    pub fn task(&self, id: &TaskId) -> Option<Arc<Task>> {
        self.state.get(id).cloned()
    }

    pub fn loading(&self) -> bool {
        self.state.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.state.error.as_deref()
    }

    pub fn search_term(&self) -> &str {
        &self.state.search_term
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.state.last_updated
    }

    pub fn state(&self) -> Arc<Store> {
        Arc::clone(&self.state)
    }

    /// Incremented every time the store is replaced.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Current time at the millisecond precision timestamps are stored with.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    pub fn views(&self) -> &ViewCache {
        &self.views
    }

    pub fn persistence(&self) -> &PersistenceAdapter {
        &self.persistence
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            tasks: self.tasks().iter().map(|task| Task::clone(task)).collect(),
            loading: self.loading(),
            error: self.state.error.clone(),
            last_updated: self.last_updated(),
            stats: self.stats(),
        }
    }
}

impl<S> std::fmt::Debug for TaskBoard<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskBoard")
            .field("revision", &self.revision)
            .field("tasks", &self.state.len())
            .field("id_strategy", &self.id_strategy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::persistence::DEFAULT_STATE_KEY;
    use crate::source::MemoryTaskSource;
    use crate::storage::{MemoryStorage, StateStorage};
    use chrono::{Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap()
    }

    fn seed(id: u64, status: TaskStatus) -> Task {
        let mut draft = NewTask::new(format!("seed {id}"), start() + Duration::days(2));
        draft.status = status;
        draft.into_task(TaskId::from(id), start() - Duration::days(1))
    }

    fn board_with(
        source: MemoryTaskSource,
        storage: Arc<MemoryStorage>,
    ) -> (TaskBoard<MemoryTaskSource>, ManualClock) {
        let clock = ManualClock::new(start());
        let board = TaskBoard::new(source, PersistenceAdapter::new(storage))
            .with_clock(clock.clone())
            .with_id_strategy(IdStrategy::Sequential);
        (board, clock)
    }

    #[tokio::test]
    async fn initialize_loads_when_nothing_persisted() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut board, _) = board_with(
            MemoryTaskSource::new(vec![seed(1, TaskStatus::Todo), seed(2, TaskStatus::Done)]),
            Arc::clone(&storage),
        );

        board.initialize().await;

        assert_eq!(board.tasks().len(), 2);
        assert!(!board.loading());
        assert_eq!(board.last_updated(), Some(start()));
        assert!(storage.read(DEFAULT_STATE_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn initialize_skips_load_after_hydrate() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let (mut board, _) = board_with(
                MemoryTaskSource::new(vec![seed(5, TaskStatus::Review)]),
                Arc::clone(&storage),
            );
            board.initialize().await;
        }

        let source = Arc::new(MemoryTaskSource::new(vec![]));
        let mut board = TaskBoard::new(Arc::clone(&source), PersistenceAdapter::new(storage));
        board.initialize().await;

        assert_eq!(source.fetches(), 0);
        assert_eq!(board.review_tasks()[0].id, TaskId::from(5));
    }

    #[tokio::test]
    async fn failed_load_records_error_and_keeps_tasks() {
        let (mut board, _) = board_with(
            MemoryTaskSource::failing("offline"),
            Arc::new(MemoryStorage::new()),
        );
        board.import_tasks(vec![seed(1, TaskStatus::Todo)]).unwrap();

        board.refresh().await;

        assert_eq!(board.error(), Some(LOAD_FAILED_MESSAGE));
        assert!(!board.loading());
        assert_eq!(board.tasks().len(), 1);
    }

    #[test]
    fn create_assigns_sequential_ids_and_stamps_times() {
        let (mut board, clock) = board_with(MemoryTaskSource::new(vec![]), Arc::new(MemoryStorage::new()));
        let first = board.create_task(NewTask::new("one", start())).unwrap();
        clock.advance(Duration::minutes(5));
        let second = board.create_task(NewTask::new("two", start())).unwrap();

        assert_eq!(first, TaskId::from(1));
        assert_eq!(second, TaskId::from(2));
        let task = board.task(&second).unwrap();
        assert_eq!(task.created_at, start() + Duration::minutes(5));
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn create_rejects_blank_title_without_dispatching() {
        let (mut board, _) = board_with(MemoryTaskSource::new(vec![]), Arc::new(MemoryStorage::new()));
        assert!(board.create_task(NewTask::new("  ", start())).is_err());
        assert_eq!(board.revision(), 0);
    }

    #[test]
    fn no_op_commands_do_not_bump_revision_or_persist() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut board, _) = board_with(MemoryTaskSource::new(vec![]), Arc::clone(&storage));

        board.update_task_status(TaskId::from(99), TaskStatus::Done);
        board.delete_task(TaskId::from(99));
        board.clear_error();

        assert_eq!(board.revision(), 0);
        assert!(storage.read(DEFAULT_STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn empty_patch_leaves_task_untouched() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut board, clock) = board_with(MemoryTaskSource::new(vec![]), Arc::clone(&storage));
        board.import_tasks(vec![seed(1, TaskStatus::Todo)]).unwrap();
        let revision = board.revision();
        let persisted = storage.read(DEFAULT_STATE_KEY).unwrap();

        clock.advance(Duration::hours(1));
        board.update_task(TaskId::from(1), TaskPatch::default()).unwrap();

        assert_eq!(board.revision(), revision);
        assert_eq!(board.task(&TaskId::from(1)).unwrap().updated_at, start() - Duration::days(1));
        assert_eq!(storage.read(DEFAULT_STATE_KEY).unwrap(), persisted);
    }

    #[test]
    fn sub_millisecond_clock_is_truncated() {
        let (mut board, clock) = board_with(MemoryTaskSource::new(vec![]), Arc::new(MemoryStorage::new()));
        clock.set(start() + Duration::nanoseconds(1_500_700));
        let id = board
            .create_task(NewTask::new("precise", start() + Duration::nanoseconds(999)))
            .unwrap();

        let task = board.task(&id).unwrap();
        assert_eq!(task.created_at, start() + Duration::milliseconds(1));
        assert_eq!(task.due_date, start());
        assert_eq!(board.last_updated(), Some(start() + Duration::milliseconds(1)));
    }

    #[test]
    fn search_does_not_persist_but_filters() {
        let storage = Arc::new(MemoryStorage::new());
        let (mut board, _) = board_with(MemoryTaskSource::new(vec![]), Arc::clone(&storage));
        board.import_tasks(vec![seed(1, TaskStatus::Todo), seed(2, TaskStatus::Todo)]).unwrap();
        let persisted = storage.read(DEFAULT_STATE_KEY).unwrap();

        board.search_tasks("SEED 2");
        assert_eq!(board.filtered_tasks().len(), 1);
        assert_eq!(storage.read(DEFAULT_STATE_KEY).unwrap(), persisted);

        board.clear_search();
        assert_eq!(board.filtered_tasks().len(), 2);
    }

    #[test]
    fn views_are_cached_per_revision() {
        let (mut board, _) = board_with(MemoryTaskSource::new(vec![]), Arc::new(MemoryStorage::new()));
        board.import_tasks(vec![seed(1, TaskStatus::Todo)]).unwrap();

        let first = board.todo_tasks();
        let again = board.todo_tasks();
        assert!(Arc::ptr_eq(&first, &again));

        board.update_task_status(TaskId::from(1), TaskStatus::Done);
        assert!(board.todo_tasks().is_empty());
        assert_eq!(board.done_tasks().len(), 1);
    }

    #[test]
    fn export_is_ordered_pretty_array() {
        let (mut board, _) = board_with(MemoryTaskSource::new(vec![]), Arc::new(MemoryStorage::new()));
        board.import_tasks(vec![seed(3, TaskStatus::Todo), seed(1, TaskStatus::Todo)]).unwrap();

        let exported = board.export_tasks().unwrap();
        assert!(exported.starts_with("[\n"));
        let parsed: Vec<Task> = serde_json::from_str(&exported).unwrap();
        let ids: Vec<_> = parsed.iter().map(|task| task.id.to_string()).collect();
        assert_eq!(ids, vec!["3", "1"]);
    }

    #[test]
    fn import_json_accepts_export_and_document_forms() {
        let (mut board, _) = board_with(MemoryTaskSource::new(vec![]), Arc::new(MemoryStorage::new()));
        board.import_tasks(vec![seed(1, TaskStatus::Todo)]).unwrap();
        let exported = board.export_tasks().unwrap();

        board.import_json(&format!("{{\"tasks\": {exported}}}")).unwrap();
        assert_eq!(board.tasks().len(), 1);
        board.import_json("[]").unwrap();
        assert!(board.tasks().is_empty());
        assert!(board.import_json("{\"nope\": 1}").is_err());
    }

    #[test]
    fn export_file_name_uses_utc_date() {
        assert_eq!(export_file_name(start()), "tasks-backup-2024-03-04.json");
    }

    #[test]
    fn snapshot_reports_stats_and_flags() {
        let (mut board, clock) = board_with(MemoryTaskSource::new(vec![]), Arc::new(MemoryStorage::new()));
        board.import_tasks(vec![seed(1, TaskStatus::InProgress), seed(2, TaskStatus::Done)]).unwrap();
        clock.advance(Duration::days(3));
        board.set_error("boom");

        let snapshot = board.snapshot();
        assert_eq!(snapshot.tasks.len(), 2);
        assert_eq!(snapshot.error.as_deref(), Some("boom"));
        assert_eq!(snapshot.stats.in_progress, 1);
        assert_eq!(snapshot.stats.completed, 1);
        assert_eq!(snapshot.stats.overdue, 1);
    }
}
