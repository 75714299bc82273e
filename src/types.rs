//! Core types for the task planner.
//!
//! Records serialize with camelCase field names. Patches keep every field
//! independently present or absent so the repository and the client store
//! apply exactly the same partial-update rules.

use crate::error::{RepoError, RepoResult, require_text};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the list created at first startup.
pub const DEFAULT_LIST_NAME: &str = "Inbox";
pub const DEFAULT_LIST_COLOR: &str = "#3B82F6";
pub const DEFAULT_LIST_EMOJI: &str = "📥";

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::None => "none",
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl FromStr for Priority {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(Priority::None),
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(RepoError::invalid_value(
                "priority",
                &format!("unknown priority '{}'", other),
            )),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A named container grouping tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub is_default: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A many-to-many tag attachable to any task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: String,
    pub name: String,
    pub color: String,
    pub emoji: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// The primary schedulable unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub list_id: String,
    pub name: String,
    pub description: String,
    /// Scheduled day (ms since epoch).
    pub date: Option<i64>,
    pub deadline: Option<i64>,
    pub priority: Priority,
    pub estimated_time: String,
    pub actual_time: String,
    pub completed: bool,
    pub completed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A checklist item scoped to one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: String,
    pub task_id: String,
    pub name: String,
    pub completed: bool,
    pub completed_at: Option<i64>,
    pub created_at: i64,
}

/// Association between a task and a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLabel {
    pub task_id: String,
    pub label_id: String,
}

/// Kind of change recorded in the task audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskLogAction {
    Created,
    Updated,
}

impl TaskLogAction {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskLogAction::Created => "created",
            TaskLogAction::Updated => "updated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(TaskLogAction::Created),
            "updated" => Some(TaskLogAction::Updated),
            _ => None,
        }
    }
}

/// Append-only audit record of a task change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLog {
    pub id: String,
    pub task_id: String,
    pub action: TaskLogAction,
    /// JSON snapshot of the request payload that caused the change.
    pub changes: String,
    pub created_at: i64,
}

/// How a reminder is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    #[default]
    Notification,
    Email,
}

impl ReminderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderKind::Notification => "notification",
            ReminderKind::Email => "email",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notification" => Some(ReminderKind::Notification),
            "email" => Some(ReminderKind::Email),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub task_id: String,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub minutes_before: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub task_id: String,
    pub name: String,
    pub url: String,
    pub created_at: i64,
}

/// Which subtasks to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtaskScope {
    /// Every subtask across all tasks (used for full hydration).
    All,
    Task(String),
}

impl SubtaskScope {
    /// Wire value selecting every subtask.
    pub const ALL: &'static str = "all";

    pub fn from_param(value: &str) -> Self {
        if value == Self::ALL {
            SubtaskScope::All
        } else {
            SubtaskScope::Task(value.to_string())
        }
    }
}

/// Flip a completion flag and keep `completed_at` in step with it.
///
/// `completed_at` is stamped only on a false→true transition and cleared on
/// true→false; re-completing an already completed item keeps the original stamp.
pub fn apply_completion(
    completed: &mut bool,
    completed_at: &mut Option<i64>,
    value: bool,
    now: i64,
) {
    if value {
        if !*completed || completed_at.is_none() {
            *completed_at = Some(now);
        }
    } else {
        *completed_at = None;
    }
    *completed = value;
}

/// Deserialize a nullable field so that "absent" and "null" stay distinct.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn check_present_text(field: &str, value: &Option<String>) -> RepoResult<()> {
    match value {
        Some(v) => require_text(field, Some(v)),
        None => Ok(()),
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<String>,
}

impl NewTask {
    pub fn new(list_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            list_id: Some(list_id.into()),
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// Check required fields before anything is written.
    pub fn validate(&self) -> RepoResult<()> {
        require_text("listId", self.list_id.as_deref())?;
        require_text("name", self.name.as_deref())?;
        Ok(())
    }

    /// Build the full record, filling defaults for absent fields.
    pub fn into_task(self, id: String, now: i64) -> RepoResult<Task> {
        self.validate()?;
        Ok(Task {
            id,
            list_id: self.list_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            date: self.date,
            deadline: self.deadline,
            priority: self.priority.unwrap_or_default(),
            estimated_time: self.estimated_time.unwrap_or_default(),
            actual_time: self.actual_time.unwrap_or_default(),
            completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl ListPatch {
    pub fn validate(&self) -> RepoResult<()> {
        check_present_text("name", &self.name)?;
        check_present_text("color", &self.color)?;
        check_present_text("emoji", &self.emoji)
    }

    pub fn apply(&self, list: &mut List, now: i64) {
        if let Some(name) = &self.name {
            list.name = name.clone();
        }
        if let Some(color) = &self.color {
            list.color = color.clone();
        }
        if let Some(emoji) = &self.emoji {
            list.emoji = emoji.clone();
        }
        list.updated_at = now;
    }
}

/// Partial update for a label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

impl LabelPatch {
    pub fn validate(&self) -> RepoResult<()> {
        check_present_text("name", &self.name)?;
        check_present_text("color", &self.color)?;
        check_present_text("emoji", &self.emoji)
    }

    pub fn apply(&self, label: &mut Label, now: i64) {
        if let Some(name) = &self.name {
            label.name = name.clone();
        }
        if let Some(color) = &self.color {
            label.color = color.clone();
        }
        if let Some(emoji) = &self.emoji {
            label.emoji = emoji.clone();
        }
        label.updated_at = now;
    }
}

/// Partial update for a task.
///
/// `date` and `deadline` are nullable: `Some(None)` clears the value,
/// `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<Option<i64>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Option<i64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TaskPatch {
    pub fn completed(value: bool) -> Self {
        Self {
            completed: Some(value),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> RepoResult<()> {
        check_present_text("listId", &self.list_id)?;
        check_present_text("name", &self.name)
    }

    pub fn apply(&self, task: &mut Task, now: i64) {
        if let Some(list_id) = &self.list_id {
            task.list_id = list_id.clone();
        }
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(date) = self.date {
            task.date = date;
        }
        if let Some(deadline) = self.deadline {
            task.deadline = deadline;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(estimated) = &self.estimated_time {
            task.estimated_time = estimated.clone();
        }
        if let Some(actual) = &self.actual_time {
            task.actual_time = actual.clone();
        }
        if let Some(completed) = self.completed {
            apply_completion(&mut task.completed, &mut task.completed_at, completed, now);
        }
        task.updated_at = now;
    }
}

/// Partial update for a subtask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtaskPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl SubtaskPatch {
    pub fn completed(value: bool) -> Self {
        Self {
            name: None,
            completed: Some(value),
        }
    }

    pub fn validate(&self) -> RepoResult<()> {
        check_present_text("name", &self.name)
    }

    /// Subtasks carry no `updated_at`; only the named fields change.
    pub fn apply(&self, subtask: &mut Subtask, now: i64) {
        if let Some(name) = &self.name {
            subtask.name = name.clone();
        }
        if let Some(completed) = self.completed {
            apply_completion(
                &mut subtask.completed,
                &mut subtask.completed_at,
                completed,
                now,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        NewTask::new("list-1", "Write report")
            .into_task("task-1".to_string(), 1_000)
            .unwrap()
    }

    #[test]
    fn new_task_fills_defaults() {
        let task = sample_task();
        assert_eq!(task.description, "");
        assert_eq!(task.priority, Priority::None);
        assert_eq!(task.estimated_time, "");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert_eq!(task.created_at, task.updated_at);
    }

    #[test]
    fn new_task_requires_list_and_name() {
        let missing_list = NewTask {
            name: Some("x".into()),
            ..Default::default()
        };
        let err = missing_list.validate().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("listId"));

        let blank_name = NewTask::new("list-1", "  ");
        assert_eq!(blank_name.validate().unwrap_err().field.as_deref(), Some("name"));
    }

    #[test]
    fn completion_stamps_only_on_transition() {
        let mut task = sample_task();
        TaskPatch::completed(true).apply(&mut task, 2_000);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(2_000));

        TaskPatch::completed(true).apply(&mut task, 3_000);
        assert_eq!(task.completed_at, Some(2_000));
        assert_eq!(task.updated_at, 3_000);

        TaskPatch::completed(false).apply(&mut task, 4_000);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let patch: TaskPatch = serde_json::from_str(r#"{"date": null}"#).unwrap();
        assert_eq!(patch.date, Some(None));
        assert_eq!(patch.deadline, None);

        let patch: TaskPatch = serde_json::from_str(r#"{"deadline": 42}"#).unwrap();
        assert_eq!(patch.deadline, Some(Some(42)));
        assert_eq!(patch.date, None);

        let mut task = sample_task();
        task.date = Some(5);
        TaskPatch {
            date: Some(None),
            ..Default::default()
        }
        .apply(&mut task, 9);
        assert!(task.date.is_none());
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = TaskPatch {
            name: Some("Renamed".into()),
            date: Some(None),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"name": "Renamed", "date": null}));
    }

    #[test]
    fn list_patch_leaves_other_fields() {
        let mut list = List {
            id: "l".into(),
            name: "Work".into(),
            color: "#fff".into(),
            emoji: "💼".into(),
            is_default: false,
            created_at: 1,
            updated_at: 1,
        };
        ListPatch {
            color: Some("#000".into()),
            ..Default::default()
        }
        .apply(&mut list, 7);
        assert_eq!(list.name, "Work");
        assert_eq!(list.emoji, "💼");
        assert_eq!(list.color, "#000");
        assert_eq!(list.updated_at, 7);
        assert!(ListPatch { name: Some("".into()), ..Default::default() }.validate().is_err());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(serde_json::to_string(&Priority::Medium).unwrap(), "\"medium\"");
    }

    #[test]
    fn reminder_uses_type_on_the_wire() {
        let reminder = Reminder {
            id: "r".into(),
            task_id: "t".into(),
            kind: ReminderKind::Email,
            minutes_before: 15,
            created_at: 0,
        };
        let json = serde_json::to_value(&reminder).unwrap();
        assert_eq!(json["type"], "email");
        assert_eq!(json["minutesBefore"], 15);
    }

    #[test]
    fn subtask_scope_sentinel() {
        assert_eq!(SubtaskScope::from_param("all"), SubtaskScope::All);
        assert_eq!(
            SubtaskScope::from_param("abc"),
            SubtaskScope::Task("abc".into())
        );
    }
}
