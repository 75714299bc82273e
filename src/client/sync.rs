//! Commit and hydration against a backend.

use super::{ClientStore, Notice, Record, RecordKey, Undo};
use crate::db::Database;
use crate::error::{RepoError, RepoResult};
use crate::types::{
    Attachment, Label, LabelPatch, List, ListPatch, NewTask, Reminder, ReminderKind, Subtask,
    SubtaskPatch, SubtaskScope, Task, TaskLabel, TaskPatch,
};
use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

/// A remote mutation, one per optimistic store operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum Request {
    CreateList { name: String, color: String, emoji: String },
    UpdateList { id: String, patch: ListPatch },
    DeleteList { id: String },
    CreateTask(NewTask),
    UpdateTask { id: String, patch: TaskPatch },
    DeleteTask { id: String },
    CreateSubtask { task_id: String, name: String },
    UpdateSubtask { id: String, patch: SubtaskPatch },
    DeleteSubtask { id: String },
    CreateLabel { name: String, color: String, emoji: String },
    UpdateLabel { id: String, patch: LabelPatch },
    DeleteLabel { id: String },
    AttachLabel { task_id: String, label_id: String },
    DetachLabel { task_id: String, label_id: String },
    CreateReminder {
        task_id: String,
        kind: ReminderKind,
        minutes_before: i64,
    },
    DeleteReminder { id: String },
    CreateAttachment {
        task_id: String,
        name: String,
        url: String,
    },
    DeleteAttachment { id: String },
}

/// Where the store's data lives.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn fetch_lists(&self) -> RepoResult<Vec<List>>;
    async fn fetch_tasks(&self) -> RepoResult<Vec<Task>>;
    async fn fetch_labels(&self) -> RepoResult<Vec<Label>>;
    async fn fetch_subtasks(&self, scope: SubtaskScope) -> RepoResult<Vec<Subtask>>;
    async fn fetch_task_labels(&self) -> RepoResult<Vec<TaskLabel>>;
    async fn fetch_reminders(&self) -> RepoResult<Vec<Reminder>>;
    async fn fetch_attachments(&self) -> RepoResult<Vec<Attachment>>;

    /// Perform a mutation, returning the confirmed record for creates and updates.
    async fn execute(&self, request: Request) -> RepoResult<Option<Record>>;
}

/// A locally applied mutation awaiting its remote commit.
#[derive(Debug, Clone, PartialEq)]
pub struct Pending {
    pub request: Request,
    pub undo: Undo,
    /// Key of the optimistic record for creates.
    pub provisional: Option<RecordKey>,
}

impl Pending {
    pub(crate) fn new(request: Request, undo: Undo) -> Self {
        Self {
            request,
            undo,
            provisional: None,
        }
    }

    pub(crate) fn create(request: Request, key: RecordKey) -> Self {
        Self {
            request,
            undo: Undo::Remove(key.clone()),
            provisional: Some(key),
        }
    }

    /// Send the request. The store is not borrowed, so several commits may
    /// be in flight at once.
    pub async fn commit<B: Backend + ?Sized>(self, backend: &B) -> Outcome {
        match backend.execute(self.request).await {
            Ok(record) => Outcome::Committed {
                record,
                provisional: self.provisional,
            },
            Err(error) => Outcome::Failed {
                error,
                undo: self.undo,
            },
        }
    }
}

/// Result of a commit, handed back to [`ClientStore::settle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Committed {
        record: Option<Record>,
        provisional: Option<RecordKey>,
    },
    Failed {
        error: RepoError,
        undo: Undo,
    },
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }
}

/// Load every collection into the store.
///
/// Lists, tasks and labels are required. Subtasks, associations, reminders
/// and attachments are optional: a failure is logged and the collection is
/// left empty.
pub async fn hydrate<B: Backend + ?Sized>(store: &mut ClientStore, backend: &B) -> RepoResult<()> {
    store.set_loading(true);
    let result = hydrate_inner(store, backend).await;
    store.set_loading(false);

    if let Err(err) = &result {
        store.push_notice(Notice::from(err));
    }
    result
}

async fn hydrate_inner<B: Backend + ?Sized>(
    store: &mut ClientStore,
    backend: &B,
) -> RepoResult<()> {
    store.set_lists(backend.fetch_lists().await?);
    store.set_tasks(backend.fetch_tasks().await?);
    store.set_labels(backend.fetch_labels().await?);

    store.set_subtasks(optional("subtasks", backend.fetch_subtasks(SubtaskScope::All).await));
    store.set_task_labels(optional("task labels", backend.fetch_task_labels().await));
    store.set_reminders(optional("reminders", backend.fetch_reminders().await));
    store.set_attachments(optional("attachments", backend.fetch_attachments().await));

    debug!(
        lists = store.lists().len(),
        tasks = store.tasks().len(),
        labels = store.labels().len(),
        subtasks = store.subtasks().len(),
        "Hydrated client store"
    );
    Ok(())
}

fn optional<T>(what: &str, result: RepoResult<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|err| {
        warn!(collection = what, error = %err, "Optional collection unavailable");
        Vec::new()
    })
}

#[async_trait]
impl Backend for Database {
    async fn fetch_lists(&self) -> RepoResult<Vec<List>> {
        self.list_lists()
    }

    async fn fetch_tasks(&self) -> RepoResult<Vec<Task>> {
        self.list_tasks(None)
    }

    async fn fetch_labels(&self) -> RepoResult<Vec<Label>> {
        self.list_labels()
    }

    async fn fetch_subtasks(&self, scope: SubtaskScope) -> RepoResult<Vec<Subtask>> {
        self.list_subtasks(scope)
    }

    async fn fetch_task_labels(&self) -> RepoResult<Vec<TaskLabel>> {
        self.list_task_labels(None)
    }

    async fn fetch_reminders(&self) -> RepoResult<Vec<Reminder>> {
        self.list_reminders(None)
    }

    async fn fetch_attachments(&self) -> RepoResult<Vec<Attachment>> {
        self.list_attachments(None)
    }

    async fn execute(&self, request: Request) -> RepoResult<Option<Record>> {
        let record = match request {
            Request::CreateList { name, color, emoji } => {
                Some(Record::List(self.create_list(&name, &color, &emoji)?))
            }
            Request::UpdateList { id, patch } => Some(Record::List(self.update_list(&id, &patch)?)),
            Request::DeleteList { id } => {
                self.delete_list(&id)?;
                None
            }
            Request::CreateTask(input) => Some(Record::Task(self.create_task(&input)?)),
            Request::UpdateTask { id, patch } => Some(Record::Task(self.update_task(&id, &patch)?)),
            Request::DeleteTask { id } => {
                self.delete_task(&id)?;
                None
            }
            Request::CreateSubtask { task_id, name } => {
                Some(Record::Subtask(self.create_subtask(&task_id, &name)?))
            }
            Request::UpdateSubtask { id, patch } => {
                Some(Record::Subtask(self.update_subtask(&id, &patch)?))
            }
            Request::DeleteSubtask { id } => {
                self.delete_subtask(&id)?;
                None
            }
            Request::CreateLabel { name, color, emoji } => {
                Some(Record::Label(self.create_label(&name, &color, &emoji)?))
            }
            Request::UpdateLabel { id, patch } => {
                Some(Record::Label(self.update_label(&id, &patch)?))
            }
            Request::DeleteLabel { id } => {
                self.delete_label(&id)?;
                None
            }
            Request::AttachLabel { task_id, label_id } => {
                let (pair, _) = self.create_task_label(&task_id, &label_id)?;
                Some(Record::TaskLabel(pair))
            }
            Request::DetachLabel { task_id, label_id } => {
                self.delete_task_label(&task_id, &label_id)?;
                None
            }
            Request::CreateReminder {
                task_id,
                kind,
                minutes_before,
            } => Some(Record::Reminder(self.create_reminder(
                &task_id,
                kind,
                minutes_before,
            )?)),
            Request::DeleteReminder { id } => {
                self.delete_reminder(&id)?;
                None
            }
            Request::CreateAttachment { task_id, name, url } => Some(Record::Attachment(
                self.create_attachment(&task_id, &name, &url)?,
            )),
            Request::DeleteAttachment { id } => {
                self.delete_attachment(&id)?;
                None
            }
        };
        Ok(record)
    }
}
