//! Task command implementations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{Context, Session};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::task::{NewTask, Task, TaskPatch, TaskPriority, TaskStatus};
use crate::timestamp::{format_timestamp, parse_timestamp};
use crate::views::TaskStats;

pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due: String,
    pub assignees: Vec<String>,
    pub estimate: Option<f64>,
}

pub struct UpdateOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due: Option<String>,
    pub assignees: Vec<String>,
    pub clear_assignees: bool,
    pub estimate: Option<f64>,
    pub actual: Option<f64>,
}

/// A task as shown to CLI consumers, with its due date evaluated.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskView<'a> {
    #[serde(flatten)]
    task: &'a Task,
    overdue: bool,
    due_label: String,
}

impl<'a> TaskView<'a> {
    pub(crate) fn new(task: &'a Task, now: DateTime<Utc>) -> Self {
        Self {
            task,
            overdue: task.is_overdue(now),
            due_label: task.due_label(now),
        }
    }
}

#[derive(Serialize)]
struct TaskListOutput<'a> {
    total: usize,
    tasks: Vec<TaskView<'a>>,
}

#[derive(Serialize)]
struct TaskDeletedOutput {
    id: String,
    deleted: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsOutput {
    #[serde(flatten)]
    stats: TaskStats,
    todo: usize,
    review: usize,
}

pub fn run_list(ctx: &Context, status: Option<String>, search: Option<String>) -> Result<()> {
    let mut session = ctx.open()?;
    let status = status.as_deref().map(str::parse::<TaskStatus>).transpose()?;

    let listed = match search {
        Some(term) => {
            session.board.search_tasks(term);
            session.board.filtered_tasks()
        }
        None => match status {
            Some(status) => session.board.tasks_with_status(status),
            None => session.board.tasks(),
        },
    };
    let tasks: Vec<&Arc<Task>> = listed
        .iter()
        .filter(|task| status.map_or(true, |wanted| task.status == wanted))
        .collect();

    let now = session.board.now();
    let output = TaskListOutput {
        total: tasks.len(),
        tasks: tasks.iter().map(|task| TaskView::new(task, now)).collect(),
    };

    let mut human = HumanOutput::new("Tasks");
    human.push_summary("Total", tasks.len().to_string());
    if let Some(status) = status {
        human.push_summary("Status", status.as_str());
    }
    if !session.board.search_term().is_empty() {
        human.push_summary("Search", session.board.search_term());
    }
    for task in &tasks {
        human.push_detail(task_line(task, now));
    }
    push_board_warning(&mut human, &session);

    emit_success(ctx.output, "list", &output, Some(&human))
}

pub fn run_show(ctx: &Context, id: &str) -> Result<()> {
    let session = ctx.open()?;
    let task = session.require_task(id)?;
    let now = session.board.now();

    let mut human = HumanOutput::new(format!("Task {}", task.id));
    push_task_summary(&mut human, &task, now);
    if !task.description.is_empty() {
        human.push_detail(task.description.clone());
    }

    emit_success(ctx.output, "show", &TaskView::new(&task, now), Some(&human))
}

pub fn run_add(ctx: &Context, options: AddOptions) -> Result<()> {
    let mut session = ctx.open()?;

    let mut draft = NewTask::new(options.title.trim(), parse_due(&options.due)?);
    draft.description = options.description.unwrap_or_default();
    draft.priority = options.priority.parse::<TaskPriority>()?;
    draft.status = options.status.parse::<TaskStatus>()?;
    draft.assignees = split_assignees(&options.assignees);
    draft.estimated_hours = options.estimate;

    let id = session.board.create_task(draft)?;
    let task = session.require_task(id.as_str())?;
    let now = session.board.now();

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &task, now);
    push_board_warning(&mut human, &session);
    human.push_next_step(format!("taskboard move {id} in-progress"));

    emit_success(ctx.output, "add", &TaskView::new(&task, now), Some(&human))
}

pub fn run_update(ctx: &Context, options: UpdateOptions) -> Result<()> {
    let mut session = ctx.open()?;
    let existing = session.require_task(&options.id)?;

    let assignees = if options.clear_assignees {
        Some(Vec::new())
    } else if options.assignees.is_empty() {
        None
    } else {
        Some(split_assignees(&options.assignees))
    };
    let patch = TaskPatch {
        title: options.title,
        description: options.description,
        status: options.status.as_deref().map(str::parse).transpose()?,
        priority: options.priority.as_deref().map(str::parse).transpose()?,
        due_date: options.due.as_deref().map(parse_due).transpose()?,
        assignees,
        estimated_hours: options.estimate.map(Some),
        actual_hours: options.actual.map(Some),
    };
    if patch.is_empty() {
        return Err(Error::InvalidArgument(
            "nothing to update; pass at least one field".to_string(),
        ));
    }

    session.board.update_task(existing.id.clone(), patch)?;
    let task = session.require_task(existing.id.as_str())?;
    let now = session.board.now();

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &task, now);

    emit_success(ctx.output, "update", &TaskView::new(&task, now), Some(&human))
}

pub fn run_move(ctx: &Context, id: &str, status: &str) -> Result<()> {
    let status = status.parse::<TaskStatus>()?;
    set_status(ctx, "move", id, |_| status)
}

pub fn run_toggle(ctx: &Context, id: &str) -> Result<()> {
    set_status(ctx, "toggle", id, TaskStatus::toggled)
}

fn set_status(
    ctx: &Context,
    command: &str,
    id: &str,
    next: impl FnOnce(TaskStatus) -> TaskStatus,
) -> Result<()> {
    let mut session = ctx.open()?;
    let existing = session.require_task(id)?;
    let status = next(existing.status);

    session.board.update_task_status(existing.id.clone(), status);
    let task = session.require_task(existing.id.as_str())?;
    let now = session.board.now();

    let mut human = HumanOutput::new(format!("Task {} is {}", task.id, task.status));
    human.push_summary("From", existing.status.as_str());
    human.push_summary("To", task.status.as_str());

    emit_success(ctx.output, command, &TaskView::new(&task, now), Some(&human))
}

pub fn run_rm(ctx: &Context, id: &str) -> Result<()> {
    let mut session = ctx.open()?;
    let existing = session.require_task(id)?;
    session.board.delete_task(existing.id.clone());

    let output = TaskDeletedOutput {
        id: existing.id.to_string(),
        deleted: true,
    };
    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", existing.id.as_str());
    human.push_summary("Title", existing.title.as_str());

    emit_success(ctx.output, "rm", &output, Some(&human))
}

pub fn run_stats(ctx: &Context) -> Result<()> {
    let session = ctx.open()?;
    let stats = session.board.stats();
    let output = StatsOutput {
        stats,
        todo: session.board.todo_tasks().len(),
        review: session.board.review_tasks().len(),
    };

    let mut human = HumanOutput::new("Board stats");
    human.push_summary("Total", stats.total.to_string());
    human.push_summary("To do", output.todo.to_string());
    human.push_summary("In progress", stats.in_progress.to_string());
    human.push_summary("Review", output.review.to_string());
    human.push_summary("Completed", stats.completed.to_string());
    human.push_summary("Overdue", stats.overdue.to_string());
    if let Some(updated) = session.board.last_updated() {
        human.push_summary("Last updated", format_timestamp(&updated));
    }
    push_board_warning(&mut human, &session);

    emit_success(ctx.output, "stats", &output, Some(&human))
}

fn parse_due(raw: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw).map_err(|err| Error::InvalidArgument(format!("--due: {err}")))
}

fn split_assignees(raw: &[String]) -> Vec<String> {
    raw.iter()
        .flat_map(|entry| NewTask::parse_assignee_list(entry))
        .collect()
}

fn task_line(task: &Task, now: DateTime<Utc>) -> String {
    let mut line = format!(
        "[{}][{}] {} {} (due {})",
        task.status,
        task.priority,
        task.id,
        task.title,
        task.due_label(now)
    );
    if task.is_overdue(now) {
        line.push_str(" OVERDUE");
    }
    line
}

fn push_task_summary(human: &mut HumanOutput, task: &Task, now: DateTime<Utc>) {
    human.push_summary("ID", task.id.as_str());
    human.push_summary("Title", task.title.as_str());
    human.push_summary("Status", task.status.as_str());
    human.push_summary("Priority", task.priority.as_str());
    human.push_summary(
        "Due",
        format!("{} ({})", format_timestamp(&task.due_date), task.due_label(now)),
    );
    if let Some(assignees) = task.assignees.as_ref().filter(|list| !list.is_empty()) {
        human.push_summary("Assignees", assignees.join(", "));
    }
    if let Some(hours) = task.estimated_hours {
        human.push_summary("Estimate", format!("{hours}h"));
    }
    if let Some(hours) = task.actual_hours {
        human.push_summary("Actual", format!("{hours}h"));
    }
    if task.is_overdue(now) {
        human.push_warning("task is overdue");
    }
}

fn push_board_warning(human: &mut HumanOutput, session: &Session) {
    if let Some(error) = session.board.error() {
        human.push_warning(error);
        human.push_next_step("taskboard refresh");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;
    use chrono::{Duration, TimeZone};

    #[test]
    fn split_assignees_flattens_comma_lists() {
        let raw = vec!["ana, bo".to_string(), " ".to_string(), "cy".to_string()];
        assert_eq!(split_assignees(&raw), vec!["ana", "bo", "cy"]);
    }

    #[test]
    fn task_view_flattens_task_fields() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let task = NewTask::new("Plan", now - Duration::days(2)).into_task(TaskId::from(3), now);
        let value = serde_json::to_value(TaskView::new(&task, now)).unwrap();
        assert_eq!(value["id"], "3");
        assert_eq!(value["overdue"], true);
        assert_eq!(value["dueLabel"], "2 days ago");
        assert_eq!(value["dueDate"], "2024-04-29T12:00:00.000Z");
    }

    #[test]
    fn bad_due_is_user_error() {
        let err = parse_due("next tuesday").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
