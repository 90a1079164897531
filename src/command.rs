//! Commands accepted by the board.

use crate::task::{Task, TaskId, TaskPatch, TaskStatus};

/// Every mutation or intent the board understands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// A bulk replace is pending.
    LoadTasks,
    /// Replace all tasks, keeping the given order.
    LoadTasksSuccess(Vec<Task>),
    LoadTasksFailure(String),
    /// Append a task carrying a pre-assigned id.
    CreateTask(Task),
    UpdateTask { id: TaskId, patch: TaskPatch },
    UpdateTaskStatus { id: TaskId, status: TaskStatus },
    DeleteTask(TaskId),
    SearchTasks(String),
    SetLoading(bool),
    SetError(String),
    ClearError,
    /// Restore from durable storage.
    Hydrate,
    /// Snapshot to durable storage.
    Persist,
}

impl Command {
    /// Stable name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::LoadTasks => "load_tasks",
            Command::LoadTasksSuccess(_) => "load_tasks_success",
            Command::LoadTasksFailure(_) => "load_tasks_failure",
            Command::CreateTask(_) => "create_task",
            Command::UpdateTask { .. } => "update_task",
            Command::UpdateTaskStatus { .. } => "update_task_status",
            Command::DeleteTask(_) => "delete_task",
            Command::SearchTasks(_) => "search_tasks",
            Command::SetLoading(_) => "set_loading",
            Command::SetError(_) => "set_error",
            Command::ClearError => "clear_error",
            Command::Hydrate => "hydrate",
            Command::Persist => "persist",
        }
    }

    /// Whether the resulting state is written to durable storage.
    ///
    /// Only task data changes qualify; loading, error, and search flags are
    /// transient.
    pub fn persists(&self) -> bool {
        matches!(
            self,
            Command::CreateTask(_)
                | Command::UpdateTask { .. }
                | Command::UpdateTaskStatus { .. }
                | Command::DeleteTask(_)
                | Command::LoadTasksSuccess(_)
        )
    }
}
