//! Task entity model.
//!
//! Tasks are serialized with camelCase field names and kebab-case status
//! values so bulk load documents, the persisted state record, and exports
//! share one shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::timestamp;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Opaque, stable task identifier.
///
/// Legacy documents carry numeric ids; those are accepted and kept in their
/// decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value of the id, when it is a plain decimal integer.
    pub fn as_number(&self) -> Option<u64> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        self.0.parse().ok()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<u64> for TaskId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(u64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) if text.trim().is_empty() => {
                Err(serde::de::Error::custom("task id cannot be empty"))
            }
            RawId::Text(text) => Ok(TaskId(text)),
            RawId::Number(number) => Ok(TaskId(number.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    /// Done flips back to todo; everything else completes.
    pub fn toggled(self) -> Self {
        if self == TaskStatus::Done {
            TaskStatus::Todo
        } else {
            TaskStatus::Done
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('_', "-");
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown status '{raw}' (expected todo|in-progress|review|done)"
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            _ => Err(Error::InvalidArgument(format!(
                "unknown priority '{raw}' (expected low|medium|high)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(with = "crate::timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
}

impl Task {
    /// Not done and due strictly before `now`.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Done && self.due_date < now
    }

    /// Case-insensitive match of an already lowercased needle against title,
    /// description, and assignees.
    pub fn matches_term(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.description.to_lowercase().contains(needle)
            || self
                .assignees
                .as_ref()
                .map(|assignees| {
                    assignees
                        .iter()
                        .any(|assignee| assignee.to_lowercase().contains(needle))
                })
                .unwrap_or(false)
    }

    /// Relative due date: `Today`, `Tomorrow`, `Yesterday`, `N days ago`, `in N days`.
    pub fn due_label(&self, now: DateTime<Utc>) -> String {
        let diff_millis = (self.due_date - now).num_milliseconds();
        // Round toward positive infinity, matching whole-day buckets.
        let days = diff_millis.div_euclid(MILLIS_PER_DAY)
            + i64::from(diff_millis.rem_euclid(MILLIS_PER_DAY) != 0);
        match days {
            0 => "Today".to_string(),
            1 => "Tomorrow".to_string(),
            -1 => "Yesterday".to_string(),
            d if d < 0 => format!("{} days ago", d.abs()),
            d => format!("in {d} days"),
        }
    }

    fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_hours(self.estimated_hours, "estimatedHours")?;
        validate_hours(self.actual_hours, "actualHours")?;
        for value in [self.due_date, self.created_at, self.updated_at] {
            timestamp::normalize(value)?;
        }
        Ok(())
    }

    /// Same task with every timestamp cut to millisecond precision.
    pub fn normalized(mut self) -> Task {
        self.due_date = self.due_date.trunc_subsecs(3);
        self.created_at = self.created_at.trunc_subsecs(3);
        self.updated_at = self.updated_at.trunc_subsecs(3);
        self
    }
}

/// Fields supplied by a caller creating a task; the board assigns id and
/// creation timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(with = "crate::timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_hours: Option<f64>,
}

impl NewTask {
    pub fn new(title: impl Into<String>, due_date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date,
            assignees: Vec::new(),
            estimated_hours: None,
            actual_hours: None,
        }
    }

    /// Split a comma-separated assignee field, trimming entries and
    /// dropping blanks.
    pub fn parse_assignee_list(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_hours(self.estimated_hours, "estimatedHours")?;
        validate_hours(self.actual_hours, "actualHours")?;
        timestamp::normalize(self.due_date)?;
        Ok(())
    }

    pub fn into_task(self, id: TaskId, now: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: self.priority,
            due_date: self.due_date.trunc_subsecs(3),
            created_at: now.trunc_subsecs(3),
            updated_at: now.trunc_subsecs(3),
            assignees: Some(self.assignees),
            estimated_hours: self.estimated_hours,
            actual_hours: self.actual_hours,
        }
    }
}

/// Partial update; only supplied fields are merged.
///
/// The hour fields are doubly optional: `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    #[serde(
        default,
        with = "crate::timestamp::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub estimated_hours: Option<Option<f64>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub actual_hours: Option<Option<f64>>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(hours) = self.estimated_hours {
            validate_hours(hours, "estimatedHours")?;
        }
        if let Some(hours) = self.actual_hours {
            validate_hours(hours, "actualHours")?;
        }
        if let Some(due_date) = self.due_date {
            timestamp::normalize(due_date)?;
        }
        Ok(())
    }

    /// Merge onto `task`, stamping `updated_at`.
    pub fn apply_to(&self, task: &Task, now: DateTime<Utc>) -> Task {
        let mut next = task.clone();
        if let Some(title) = &self.title {
            next.title = title.clone();
        }
        if let Some(description) = &self.description {
            next.description = description.clone();
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(priority) = self.priority {
            next.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            next.due_date = due_date.trunc_subsecs(3);
        }
        if let Some(assignees) = &self.assignees {
            next.assignees = Some(assignees.clone());
        }
        if let Some(hours) = self.estimated_hours {
            next.estimated_hours = hours;
        }
        if let Some(hours) = self.actual_hours {
            next.actual_hours = hours;
        }
        next.updated_at = now.trunc_subsecs(3);
        next
    }
}

fn double_option<'de, D>(deserializer: D) -> std::result::Result<Option<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f64>::deserialize(deserializer).map(Some)
}

fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
    }
    Ok(())
}

fn validate_hours(hours: Option<f64>, field: &str) -> Result<()> {
    match hours {
        Some(value) if !value.is_finite() || value < 0.0 => Err(Error::InvalidArgument(format!(
            "{field} must be a non-negative number, got {value}"
        ))),
        _ => Ok(()),
    }
}

/// Validate a batch of tasks read from an external document.
pub fn validate_tasks(tasks: &[Task]) -> Result<()> {
    for task in tasks {
        task.validate()
            .map_err(|err| Error::InvalidArgument(format!("task {}: {err}", task.id)))?;
    }
    Ok(())
}

/// Bulk load document: `{ "tasks": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDocument {
    pub tasks: Vec<Task>,
}
