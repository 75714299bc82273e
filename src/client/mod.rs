//! In-memory client state with optimistic mutations.
//!
//! [`ClientStore`] mirrors the persisted collections plus the selector the
//! view engine reads. Every mutation applies locally right away and hands back
//! a [`Pending`]: the request to send and the [`Undo`] that reverses the local
//! change. Callers commit the request, then pass the [`Outcome`] to
//! [`ClientStore::settle`] (or call [`ClientStore::revert`] themselves).
//! Nothing is retried or rolled back behind the caller's back.

pub mod sync;

pub use sync::{Backend, Outcome, Pending, Request, hydrate};

use crate::db::{new_id, now_ms};
use crate::error::{ErrorCode, RepoError, RepoResult, require_text};
use crate::types::{
    Attachment, Label, LabelPatch, List, ListPatch, NewTask, Reminder, ReminderKind, Subtask,
    SubtaskPatch, Task, TaskLabel, TaskPatch,
};
use crate::view::{SearchRanker, Selector, View, ViewEngine};
use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// Any record the store holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "camelCase")]
pub enum Record {
    List(List),
    Task(Task),
    Subtask(Subtask),
    Label(Label),
    TaskLabel(TaskLabel),
    Reminder(Reminder),
    Attachment(Attachment),
}

impl Record {
    pub fn key(&self) -> RecordKey {
        match self {
            Record::List(v) => RecordKey::List(v.id.clone()),
            Record::Task(v) => RecordKey::Task(v.id.clone()),
            Record::Subtask(v) => RecordKey::Subtask(v.id.clone()),
            Record::Label(v) => RecordKey::Label(v.id.clone()),
            Record::TaskLabel(v) => RecordKey::TaskLabel {
                task_id: v.task_id.clone(),
                label_id: v.label_id.clone(),
            },
            Record::Reminder(v) => RecordKey::Reminder(v.id.clone()),
            Record::Attachment(v) => RecordKey::Attachment(v.id.clone()),
        }
    }
}

/// Identity of a record within its collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    List(String),
    Task(String),
    Subtask(String),
    Label(String),
    TaskLabel { task_id: String, label_id: String },
    Reminder(String),
    Attachment(String),
}

/// Inverse of one local mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Undo {
    /// Put a removed record back at its former position.
    Insert { index: usize, record: Record },
    /// Drop a record that was added optimistically.
    Remove(RecordKey),
    /// Restore the previous value of an edited record.
    Replace(Record),
    /// Restore selector fields that a delete cleared.
    Selection {
        list_id: Option<String>,
        label_id: Option<String>,
        task_id: Option<String>,
    },
    /// Several undos, reverted last to first.
    Batch(Vec<Undo>),
}

impl Undo {
    pub fn none() -> Self {
        Undo::Batch(Vec::new())
    }
}

/// Transient user-facing message about a failed operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&RepoError> for Notice {
    fn from(err: &RepoError) -> Self {
        Self {
            code: err.code,
            message: err.message.clone(),
        }
    }
}

trait HasId {
    fn id(&self) -> &str;
}

macro_rules! has_id {
    ($($ty:ty),*) => {
        $(impl HasId for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

has_id!(List, Task, Subtask, Label, Reminder, Attachment);

fn find<T: HasId>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.id() == id)
}

fn insert_at<T>(items: &mut Vec<T>, index: usize, value: T) {
    let index = index.min(items.len());
    items.insert(index, value);
}

fn replace_by_id<T: HasId>(items: &mut [T], id: &str, value: T) -> bool {
    match items.iter_mut().find(|item| item.id() == id) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// Remove every matching item, recording positions so that reverting in
/// reverse order restores the original layout.
fn drain_where<T>(items: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> Vec<(usize, T)> {
    let mut removed = Vec::new();
    let mut i = 0;
    while i < items.len() {
        if pred(&items[i]) {
            removed.push((i, items.remove(i)));
        } else {
            i += 1;
        }
    }
    removed
}

/// Process-local mirror of the persisted collections plus selector state.
#[derive(Debug, Clone, Default)]
pub struct ClientStore {
    lists: Vec<List>,
    tasks: Vec<Task>,
    subtasks: Vec<Subtask>,
    labels: Vec<Label>,
    task_labels: Vec<TaskLabel>,
    reminders: Vec<Reminder>,
    attachments: Vec<Attachment>,
    selector: Selector,
    selected_task_id: Option<String>,
    is_loading: bool,
    notices: Vec<Notice>,
}

impl ClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(selector: Selector) -> Self {
        Self {
            selector,
            ..Self::default()
        }
    }

    // Collections

    pub fn lists(&self) -> &[List] {
        &self.lists
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn subtasks(&self) -> &[Subtask] {
        &self.subtasks
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn task_labels(&self) -> &[TaskLabel] {
        &self.task_labels
    }

    pub fn reminders(&self) -> &[Reminder] {
        &self.reminders
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn task(&self, task_id: &str) -> Option<&Task> {
        find(&self.tasks, task_id).map(|i| &self.tasks[i])
    }

    pub fn set_lists(&mut self, lists: Vec<List>) {
        self.lists = lists;
    }

    pub fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    pub fn set_subtasks(&mut self, subtasks: Vec<Subtask>) {
        self.subtasks = subtasks;
    }

    pub fn set_labels(&mut self, labels: Vec<Label>) {
        self.labels = labels;
    }

    pub fn set_task_labels(&mut self, task_labels: Vec<TaskLabel>) {
        self.task_labels = task_labels;
    }

    pub fn set_reminders(&mut self, reminders: Vec<Reminder>) {
        self.reminders = reminders;
    }

    pub fn set_attachments(&mut self, attachments: Vec<Attachment>) {
        self.attachments = attachments;
    }

    // Selector and UI state

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn set_view(&mut self, view: View) {
        self.selector.view = view;
    }

    pub fn select_list(&mut self, list_id: Option<String>) {
        self.selector.selected_list_id = list_id;
    }

    pub fn select_label(&mut self, label_id: Option<String>) {
        self.selector.selected_label_id = label_id;
    }

    pub fn set_show_completed(&mut self, show: bool) {
        self.selector.show_completed = show;
    }

    pub fn toggle_show_completed(&mut self) {
        self.selector.show_completed = !self.selector.show_completed;
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.selector.search_query = query.into();
    }

    pub fn selected_task_id(&self) -> Option<&str> {
        self.selected_task_id.as_deref()
    }

    pub fn select_task(&mut self, task_id: Option<String>) {
        self.selected_task_id = task_id;
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Drain pending notices for display.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // Derived views

    pub fn subtasks_of(&self, task_id: &str) -> Vec<&Subtask> {
        self.subtasks.iter().filter(|s| s.task_id == task_id).collect()
    }

    pub fn labels_of(&self, task_id: &str) -> Vec<&Label> {
        self.task_labels
            .iter()
            .filter(|tl| tl.task_id == task_id)
            .filter_map(|tl| find(&self.labels, &tl.label_id).map(|i| &self.labels[i]))
            .collect()
    }

    /// `(completed, total)` subtasks of a task.
    pub fn subtask_progress(&self, task_id: &str) -> (usize, usize) {
        let subtasks = self.subtasks_of(task_id);
        let done = subtasks.iter().filter(|s| s.completed).count();
        (done, subtasks.len())
    }

    pub fn visible_tasks<R: SearchRanker, Tz: TimeZone>(
        &self,
        engine: &ViewEngine<R>,
        now: &DateTime<Tz>,
    ) -> Vec<&Task> {
        engine.visible(&self.tasks, &self.task_labels, &self.selector, now)
    }

    // Lists

    pub fn add_list(&mut self, name: &str, color: &str, emoji: &str) -> RepoResult<Pending> {
        require_text("name", Some(name))?;
        require_text("color", Some(color))?;
        require_text("emoji", Some(emoji))?;

        let now = now_ms();
        let list = List {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            emoji: emoji.to_string(),
            is_default: false,
            created_at: now,
            updated_at: now,
        };
        let key = RecordKey::List(list.id.clone());
        self.lists.push(list);

        Ok(Pending::create(
            Request::CreateList {
                name: name.to_string(),
                color: color.to_string(),
                emoji: emoji.to_string(),
            },
            key,
        ))
    }

    pub fn update_list(&mut self, list_id: &str, patch: ListPatch) -> RepoResult<Pending> {
        patch.validate()?;
        let index = find(&self.lists, list_id).ok_or_else(|| RepoError::not_found("List", list_id))?;
        let before = self.lists[index].clone();
        patch.apply(&mut self.lists[index], now_ms());

        Ok(Pending::new(
            Request::UpdateList {
                id: list_id.to_string(),
                patch,
            },
            Undo::Replace(Record::List(before)),
        ))
    }

    /// Remove a list with its tasks and everything they own.
    pub fn delete_list(&mut self, list_id: &str) -> RepoResult<Pending> {
        let index = find(&self.lists, list_id).ok_or_else(|| RepoError::not_found("List", list_id))?;
        if self.lists[index].is_default {
            return Err(RepoError::forbidden("Cannot delete the inbox list"));
        }

        let list = self.lists.remove(index);
        let mut undo = vec![Undo::Insert {
            index,
            record: Record::List(list),
        }];

        let task_ids: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| t.list_id == list_id)
            .map(|t| t.id.clone())
            .collect();
        for task_id in &task_ids {
            undo.push(self.remove_task_cascade(task_id));
        }

        if self.selector.selected_list_id.as_deref() == Some(list_id) {
            undo.push(Undo::Selection {
                list_id: self.selector.selected_list_id.take(),
                label_id: None,
                task_id: None,
            });
        }

        Ok(Pending::new(
            Request::DeleteList {
                id: list_id.to_string(),
            },
            Undo::Batch(undo),
        ))
    }

    // Tasks

    pub fn add_task(&mut self, input: NewTask) -> RepoResult<Pending> {
        input.validate()?;
        let task = input.clone().into_task(new_id(), now_ms())?;
        let key = RecordKey::Task(task.id.clone());
        // Newest first, matching the repository's ordering.
        self.tasks.insert(0, task);

        Ok(Pending::create(Request::CreateTask(input), key))
    }

    pub fn update_task(&mut self, task_id: &str, patch: TaskPatch) -> RepoResult<Pending> {
        patch.validate()?;
        let index = find(&self.tasks, task_id).ok_or_else(|| RepoError::not_found("Task", task_id))?;
        let before = self.tasks[index].clone();
        patch.apply(&mut self.tasks[index], now_ms());

        Ok(Pending::new(
            Request::UpdateTask {
                id: task_id.to_string(),
                patch,
            },
            Undo::Replace(Record::Task(before)),
        ))
    }

    /// Flip a task's completion, stamping or clearing `completed_at`.
    pub fn toggle_task_completion(&mut self, task_id: &str) -> RepoResult<Pending> {
        let completed = self
            .task(task_id)
            .map(|t| t.completed)
            .ok_or_else(|| RepoError::not_found("Task", task_id))?;
        self.update_task(task_id, TaskPatch::completed(!completed))
    }

    pub fn delete_task(&mut self, task_id: &str) -> RepoResult<Pending> {
        if find(&self.tasks, task_id).is_none() {
            return Err(RepoError::not_found("Task", task_id));
        }
        let undo = self.remove_task_cascade(task_id);

        Ok(Pending::new(
            Request::DeleteTask {
                id: task_id.to_string(),
            },
            undo,
        ))
    }

    fn remove_task_cascade(&mut self, task_id: &str) -> Undo {
        let mut undo = Vec::new();

        if let Some(index) = find(&self.tasks, task_id) {
            let task = self.tasks.remove(index);
            undo.push(Undo::Insert {
                index,
                record: Record::Task(task),
            });
        }
        for (index, s) in drain_where(&mut self.subtasks, |s| s.task_id == task_id) {
            undo.push(Undo::Insert {
                index,
                record: Record::Subtask(s),
            });
        }
        for (index, tl) in drain_where(&mut self.task_labels, |tl| tl.task_id == task_id) {
            undo.push(Undo::Insert {
                index,
                record: Record::TaskLabel(tl),
            });
        }
        for (index, r) in drain_where(&mut self.reminders, |r| r.task_id == task_id) {
            undo.push(Undo::Insert {
                index,
                record: Record::Reminder(r),
            });
        }
        for (index, a) in drain_where(&mut self.attachments, |a| a.task_id == task_id) {
            undo.push(Undo::Insert {
                index,
                record: Record::Attachment(a),
            });
        }

        if self.selected_task_id.as_deref() == Some(task_id) {
            undo.push(Undo::Selection {
                list_id: None,
                label_id: None,
                task_id: self.selected_task_id.take(),
            });
        }

        Undo::Batch(undo)
    }

    // Subtasks

    pub fn add_subtask(&mut self, task_id: &str, name: &str) -> RepoResult<Pending> {
        require_text("taskId", Some(task_id))?;
        require_text("name", Some(name))?;

        let subtask = Subtask {
            id: new_id(),
            task_id: task_id.to_string(),
            name: name.to_string(),
            completed: false,
            completed_at: None,
            created_at: now_ms(),
        };
        let key = RecordKey::Subtask(subtask.id.clone());
        self.subtasks.push(subtask);

        Ok(Pending::create(
            Request::CreateSubtask {
                task_id: task_id.to_string(),
                name: name.to_string(),
            },
            key,
        ))
    }

    pub fn update_subtask(&mut self, subtask_id: &str, patch: SubtaskPatch) -> RepoResult<Pending> {
        patch.validate()?;
        let index = find(&self.subtasks, subtask_id)
            .ok_or_else(|| RepoError::not_found("Subtask", subtask_id))?;
        let before = self.subtasks[index].clone();
        patch.apply(&mut self.subtasks[index], now_ms());

        Ok(Pending::new(
            Request::UpdateSubtask {
                id: subtask_id.to_string(),
                patch,
            },
            Undo::Replace(Record::Subtask(before)),
        ))
    }

    pub fn toggle_subtask_completion(&mut self, subtask_id: &str) -> RepoResult<Pending> {
        let completed = find(&self.subtasks, subtask_id)
            .map(|i| self.subtasks[i].completed)
            .ok_or_else(|| RepoError::not_found("Subtask", subtask_id))?;
        self.update_subtask(subtask_id, SubtaskPatch::completed(!completed))
    }

    pub fn delete_subtask(&mut self, subtask_id: &str) -> RepoResult<Pending> {
        let index = find(&self.subtasks, subtask_id)
            .ok_or_else(|| RepoError::not_found("Subtask", subtask_id))?;
        let subtask = self.subtasks.remove(index);

        Ok(Pending::new(
            Request::DeleteSubtask {
                id: subtask_id.to_string(),
            },
            Undo::Insert {
                index,
                record: Record::Subtask(subtask),
            },
        ))
    }

    // Labels

    pub fn add_label(&mut self, name: &str, color: &str, emoji: &str) -> RepoResult<Pending> {
        require_text("name", Some(name))?;
        require_text("color", Some(color))?;
        require_text("emoji", Some(emoji))?;

        let now = now_ms();
        let label = Label {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            emoji: emoji.to_string(),
            created_at: now,
            updated_at: now,
        };
        let key = RecordKey::Label(label.id.clone());
        self.labels.push(label);

        Ok(Pending::create(
            Request::CreateLabel {
                name: name.to_string(),
                color: color.to_string(),
                emoji: emoji.to_string(),
            },
            key,
        ))
    }

    pub fn update_label(&mut self, label_id: &str, patch: LabelPatch) -> RepoResult<Pending> {
        patch.validate()?;
        let index =
            find(&self.labels, label_id).ok_or_else(|| RepoError::not_found("Label", label_id))?;
        let before = self.labels[index].clone();
        patch.apply(&mut self.labels[index], now_ms());

        Ok(Pending::new(
            Request::UpdateLabel {
                id: label_id.to_string(),
                patch,
            },
            Undo::Replace(Record::Label(before)),
        ))
    }

    pub fn delete_label(&mut self, label_id: &str) -> RepoResult<Pending> {
        let index =
            find(&self.labels, label_id).ok_or_else(|| RepoError::not_found("Label", label_id))?;
        let label = self.labels.remove(index);
        let mut undo = vec![Undo::Insert {
            index,
            record: Record::Label(label),
        }];

        for (index, tl) in drain_where(&mut self.task_labels, |tl| tl.label_id == label_id) {
            undo.push(Undo::Insert {
                index,
                record: Record::TaskLabel(tl),
            });
        }

        if self.selector.selected_label_id.as_deref() == Some(label_id) {
            undo.push(Undo::Selection {
                list_id: None,
                label_id: self.selector.selected_label_id.take(),
                task_id: None,
            });
        }

        Ok(Pending::new(
            Request::DeleteLabel {
                id: label_id.to_string(),
            },
            Undo::Batch(undo),
        ))
    }

    // Task/label associations

    /// Attach a label; attaching an existing pair changes nothing locally.
    pub fn attach_label(&mut self, task_id: &str, label_id: &str) -> RepoResult<Pending> {
        require_text("taskId", Some(task_id))?;
        require_text("labelId", Some(label_id))?;

        let pair = TaskLabel {
            task_id: task_id.to_string(),
            label_id: label_id.to_string(),
        };
        let undo = if self.task_labels.contains(&pair) {
            Undo::none()
        } else {
            let key = Record::TaskLabel(pair.clone()).key();
            self.task_labels.push(pair);
            Undo::Remove(key)
        };

        Ok(Pending::new(
            Request::AttachLabel {
                task_id: task_id.to_string(),
                label_id: label_id.to_string(),
            },
            undo,
        ))
    }

    pub fn detach_label(&mut self, task_id: &str, label_id: &str) -> RepoResult<Pending> {
        let undo = match self
            .task_labels
            .iter()
            .position(|tl| tl.task_id == task_id && tl.label_id == label_id)
        {
            Some(index) => Undo::Insert {
                index,
                record: Record::TaskLabel(self.task_labels.remove(index)),
            },
            None => Undo::none(),
        };

        Ok(Pending::new(
            Request::DetachLabel {
                task_id: task_id.to_string(),
                label_id: label_id.to_string(),
            },
            undo,
        ))
    }

    // Reminders and attachments

    pub fn add_reminder(
        &mut self,
        task_id: &str,
        kind: ReminderKind,
        minutes_before: i64,
    ) -> RepoResult<Pending> {
        require_text("taskId", Some(task_id))?;
        if minutes_before < 0 {
            return Err(RepoError::invalid_value(
                "minutesBefore",
                "minutesBefore must not be negative",
            ));
        }

        let reminder = Reminder {
            id: new_id(),
            task_id: task_id.to_string(),
            kind,
            minutes_before,
            created_at: now_ms(),
        };
        let key = RecordKey::Reminder(reminder.id.clone());
        self.reminders.push(reminder);

        Ok(Pending::create(
            Request::CreateReminder {
                task_id: task_id.to_string(),
                kind,
                minutes_before,
            },
            key,
        ))
    }

    pub fn delete_reminder(&mut self, reminder_id: &str) -> RepoResult<Pending> {
        let index = find(&self.reminders, reminder_id)
            .ok_or_else(|| RepoError::not_found("Reminder", reminder_id))?;
        let reminder = self.reminders.remove(index);

        Ok(Pending::new(
            Request::DeleteReminder {
                id: reminder_id.to_string(),
            },
            Undo::Insert {
                index,
                record: Record::Reminder(reminder),
            },
        ))
    }

    pub fn add_attachment(&mut self, task_id: &str, name: &str, url: &str) -> RepoResult<Pending> {
        require_text("taskId", Some(task_id))?;
        require_text("name", Some(name))?;
        require_text("url", Some(url))?;

        let attachment = Attachment {
            id: new_id(),
            task_id: task_id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            created_at: now_ms(),
        };
        let key = RecordKey::Attachment(attachment.id.clone());
        self.attachments.push(attachment);

        Ok(Pending::create(
            Request::CreateAttachment {
                task_id: task_id.to_string(),
                name: name.to_string(),
                url: url.to_string(),
            },
            key,
        ))
    }

    pub fn delete_attachment(&mut self, attachment_id: &str) -> RepoResult<Pending> {
        let index = find(&self.attachments, attachment_id)
            .ok_or_else(|| RepoError::not_found("Attachment", attachment_id))?;
        let attachment = self.attachments.remove(index);

        Ok(Pending::new(
            Request::DeleteAttachment {
                id: attachment_id.to_string(),
            },
            Undo::Insert {
                index,
                record: Record::Attachment(attachment),
            },
        ))
    }

    // Reconciliation

    /// Apply the inverse of an optimistic mutation.
    pub fn revert(&mut self, undo: Undo) {
        match undo {
            Undo::Insert { index, record } => self.insert_record(index, record),
            Undo::Remove(key) => self.remove_record(&key),
            Undo::Replace(record) => {
                self.replace_record(&record.key(), record);
            }
            Undo::Selection {
                list_id,
                label_id,
                task_id,
            } => {
                if list_id.is_some() {
                    self.selector.selected_list_id = list_id;
                }
                if label_id.is_some() {
                    self.selector.selected_label_id = label_id;
                }
                if task_id.is_some() {
                    self.selected_task_id = task_id;
                }
            }
            Undo::Batch(undos) => {
                for undo in undos.into_iter().rev() {
                    self.revert(undo);
                }
            }
        }
    }

    /// Reconcile a finished commit.
    ///
    /// A confirmed record replaces its optimistic counterpart (provisional ids
    /// are rewritten everywhere they are referenced). A failure reverts the
    /// local change, queues a notice and is returned to the caller.
    pub fn settle(&mut self, outcome: Outcome) -> RepoResult<()> {
        match outcome {
            Outcome::Committed {
                record: Some(record),
                provisional,
            } => {
                let key = provisional.unwrap_or_else(|| record.key());
                self.rekey(&key, &record.key());
                self.replace_record(&record.key(), record);
                Ok(())
            }
            Outcome::Committed { record: None, .. } => Ok(()),
            Outcome::Failed { error, undo } => {
                self.revert(undo);
                tracing::warn!(code = ?error.code, error = %error, "Reverted optimistic change");
                self.notices.push(Notice::from(&error));
                Err(error)
            }
        }
    }

    fn insert_record(&mut self, index: usize, record: Record) {
        match record {
            Record::List(v) => insert_at(&mut self.lists, index, v),
            Record::Task(v) => insert_at(&mut self.tasks, index, v),
            Record::Subtask(v) => insert_at(&mut self.subtasks, index, v),
            Record::Label(v) => insert_at(&mut self.labels, index, v),
            Record::TaskLabel(v) => insert_at(&mut self.task_labels, index, v),
            Record::Reminder(v) => insert_at(&mut self.reminders, index, v),
            Record::Attachment(v) => insert_at(&mut self.attachments, index, v),
        }
    }

    fn remove_record(&mut self, key: &RecordKey) {
        match key {
            RecordKey::List(id) => self.lists.retain(|v| &v.id != id),
            RecordKey::Task(id) => self.tasks.retain(|v| &v.id != id),
            RecordKey::Subtask(id) => self.subtasks.retain(|v| &v.id != id),
            RecordKey::Label(id) => self.labels.retain(|v| &v.id != id),
            RecordKey::TaskLabel { task_id, label_id } => self
                .task_labels
                .retain(|v| &v.task_id != task_id || &v.label_id != label_id),
            RecordKey::Reminder(id) => self.reminders.retain(|v| &v.id != id),
            RecordKey::Attachment(id) => self.attachments.retain(|v| &v.id != id),
        }
    }

    fn replace_record(&mut self, key: &RecordKey, record: Record) -> bool {
        match (key, record) {
            (RecordKey::List(id), Record::List(v)) => replace_by_id(&mut self.lists, id, v),
            (RecordKey::Task(id), Record::Task(v)) => replace_by_id(&mut self.tasks, id, v),
            (RecordKey::Subtask(id), Record::Subtask(v)) => {
                replace_by_id(&mut self.subtasks, id, v)
            }
            (RecordKey::Label(id), Record::Label(v)) => replace_by_id(&mut self.labels, id, v),
            (RecordKey::Reminder(id), Record::Reminder(v)) => {
                replace_by_id(&mut self.reminders, id, v)
            }
            (RecordKey::Attachment(id), Record::Attachment(v)) => {
                replace_by_id(&mut self.attachments, id, v)
            }
            // Associations have no fields beyond their key.
            _ => false,
        }
    }

    /// Rewrite a provisional id to the confirmed one, including references.
    fn rekey(&mut self, from: &RecordKey, to: &RecordKey) {
        if from == to {
            return;
        }
        match (from, to) {
            (RecordKey::List(old), RecordKey::List(new)) => {
                if let Some(i) = find(&self.lists, old) {
                    self.lists[i].id = new.clone();
                }
                for task in self.tasks.iter_mut().filter(|t| &t.list_id == old) {
                    task.list_id = new.clone();
                }
                if self.selector.selected_list_id.as_ref() == Some(old) {
                    self.selector.selected_list_id = Some(new.clone());
                }
            }
            (RecordKey::Task(old), RecordKey::Task(new)) => {
                if let Some(i) = find(&self.tasks, old) {
                    self.tasks[i].id = new.clone();
                }
                for s in self.subtasks.iter_mut().filter(|s| &s.task_id == old) {
                    s.task_id = new.clone();
                }
                for tl in self.task_labels.iter_mut().filter(|tl| &tl.task_id == old) {
                    tl.task_id = new.clone();
                }
                for r in self.reminders.iter_mut().filter(|r| &r.task_id == old) {
                    r.task_id = new.clone();
                }
                for a in self.attachments.iter_mut().filter(|a| &a.task_id == old) {
                    a.task_id = new.clone();
                }
                if self.selected_task_id.as_ref() == Some(old) {
                    self.selected_task_id = Some(new.clone());
                }
            }
            (RecordKey::Label(old), RecordKey::Label(new)) => {
                if let Some(i) = find(&self.labels, old) {
                    self.labels[i].id = new.clone();
                }
                for tl in self.task_labels.iter_mut().filter(|tl| &tl.label_id == old) {
                    tl.label_id = new.clone();
                }
                if self.selector.selected_label_id.as_ref() == Some(old) {
                    self.selector.selected_label_id = Some(new.clone());
                }
            }
            (RecordKey::Subtask(old), RecordKey::Subtask(new)) => {
                if let Some(i) = find(&self.subtasks, old) {
                    self.subtasks[i].id = new.clone();
                }
            }
            (RecordKey::Reminder(old), RecordKey::Reminder(new)) => {
                if let Some(i) = find(&self.reminders, old) {
                    self.reminders[i].id = new.clone();
                }
            }
            (RecordKey::Attachment(old), RecordKey::Attachment(new)) => {
                if let Some(i) = find(&self.attachments, old) {
                    self.attachments[i].id = new.clone();
                }
            }
            _ => {}
        }
    }
}
