//! Tests for the optimistic client store against a real and a flaky backend.

use async_trait::async_trait;
use chrono::Utc;
use task_planner::client::{Backend, ClientStore, Outcome, Request, hydrate};
use task_planner::client::{Record, RecordKey};
use task_planner::db::Database;
use task_planner::error::{ErrorCode, RepoError, RepoResult};
use task_planner::types::{
    Attachment, Label, List, NewTask, Reminder, Subtask, SubtaskScope, Task, TaskLabel, TaskPatch,
};
use task_planner::view::{FuzzyRanker, View, ViewEngine};

fn setup_db() -> Database {
    Database::open_in_memory().expect("Failed to create in-memory database")
}

fn inbox_id(db: &Database) -> String {
    db.default_list().unwrap().id
}

async fn hydrated(db: &Database) -> ClientStore {
    let mut store = ClientStore::new();
    hydrate(&mut store, db).await.expect("hydrate failed");
    store
}

fn provisional_id(key: &Option<RecordKey>) -> String {
    match key {
        Some(RecordKey::Task(id)) | Some(RecordKey::List(id)) | Some(RecordKey::Label(id)) => {
            id.clone()
        }
        other => panic!("unexpected provisional key {:?}", other),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    Lists,
    Subtasks,
    Execute,
}

/// Delegates to a database but fails one kind of call.
struct FlakyBackend {
    db: Database,
    fail: Failure,
}

impl FlakyBackend {
    fn new(db: &Database, fail: Failure) -> Self {
        Self {
            db: db.clone(),
            fail,
        }
    }

    fn offline<T>(&self, what: Failure) -> RepoResult<T> {
        Err(RepoError::internal(format!("{:?} unavailable", what)))
    }
}

#[async_trait]
impl Backend for FlakyBackend {
    async fn fetch_lists(&self) -> RepoResult<Vec<List>> {
        if self.fail == Failure::Lists {
            return self.offline(Failure::Lists);
        }
        self.db.fetch_lists().await
    }

    async fn fetch_tasks(&self) -> RepoResult<Vec<Task>> {
        self.db.fetch_tasks().await
    }

    async fn fetch_labels(&self) -> RepoResult<Vec<Label>> {
        self.db.fetch_labels().await
    }

    async fn fetch_subtasks(&self, scope: SubtaskScope) -> RepoResult<Vec<Subtask>> {
        if self.fail == Failure::Subtasks {
            return self.offline(Failure::Subtasks);
        }
        self.db.fetch_subtasks(scope).await
    }

    async fn fetch_task_labels(&self) -> RepoResult<Vec<TaskLabel>> {
        self.db.fetch_task_labels().await
    }

    async fn fetch_reminders(&self) -> RepoResult<Vec<Reminder>> {
        self.db.fetch_reminders().await
    }

    async fn fetch_attachments(&self) -> RepoResult<Vec<Attachment>> {
        self.db.fetch_attachments().await
    }

    async fn execute(&self, request: Request) -> RepoResult<Option<Record>> {
        if self.fail == Failure::Execute {
            return self.offline(Failure::Execute);
        }
        self.db.execute(request).await
    }
}

mod hydrate_tests {
    use super::*;

    #[tokio::test]
    async fn loads_every_collection() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let label = db.create_label("Work", "#00f", "💼").unwrap();
        db.create_subtask(&task.id, "Outline").unwrap();
        db.create_task_label(&task.id, &label.id).unwrap();

        let store = hydrated(&db).await;

        assert!(!store.is_loading());
        assert_eq!(store.lists().len(), 1);
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.labels().len(), 1);
        assert_eq!(store.subtask_progress(&task.id), (0, 1));
        assert_eq!(store.labels_of(&task.id)[0].name, "Work");
        assert!(store.notices().is_empty());
    }

    #[tokio::test]
    async fn optional_collections_tolerate_failure() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        db.create_subtask(&task.id, "Outline").unwrap();

        let backend = FlakyBackend::new(&db, Failure::Subtasks);
        let mut store = ClientStore::new();
        hydrate(&mut store, &backend).await.unwrap();

        assert_eq!(store.tasks().len(), 1);
        assert!(store.subtasks().is_empty());
        assert!(store.notices().is_empty());
    }

    #[tokio::test]
    async fn required_collection_failure_is_reported() {
        let db = setup_db();
        let backend = FlakyBackend::new(&db, Failure::Lists);
        let mut store = ClientStore::new();

        let err = hydrate(&mut store, &backend).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalError);
        assert!(!store.is_loading());
        let notices = store.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].code, ErrorCode::InternalError);
        assert!(store.notices().is_empty());
    }
}

mod commit_tests {
    use super::*;

    #[tokio::test]
    async fn confirmed_create_replaces_provisional_id() {
        let db = setup_db();
        let mut store = hydrated(&db).await;

        let pending = store
            .add_task(NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let local_id = provisional_id(&pending.provisional);
        assert_eq!(store.tasks()[0].id, local_id);

        // Local-only child created before the parent is confirmed.
        store.add_subtask(&local_id, "Outline").unwrap();
        store.select_task(Some(local_id.clone()));

        let outcome = pending.commit(&db).await;
        assert!(outcome.is_committed());
        store.settle(outcome).unwrap();

        let persisted = db.list_tasks(None).unwrap();
        assert_eq!(persisted.len(), 1);
        let server_id = persisted[0].id.clone();
        assert_ne!(server_id, local_id);

        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0], persisted[0]);
        assert_eq!(store.subtasks()[0].task_id, server_id);
        assert_eq!(store.selected_task_id(), Some(server_id.as_str()));
    }

    #[tokio::test]
    async fn confirmed_update_takes_server_values() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let mut store = hydrated(&db).await;

        let pending = store.toggle_task_completion(&task.id).unwrap();
        assert!(store.task(&task.id).unwrap().completed);

        store.settle(pending.commit(&db).await).unwrap();

        let persisted = db.get_task(&task.id).unwrap().unwrap();
        assert!(persisted.completed);
        assert_eq!(store.task(&task.id), Some(&persisted));
    }

    #[tokio::test]
    async fn failed_update_reverts_and_notifies() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let mut store = hydrated(&db).await;
        let backend = FlakyBackend::new(&db, Failure::Execute);

        let pending = store
            .update_task(
                &task.id,
                TaskPatch {
                    name: Some("Renamed".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(store.task(&task.id).unwrap().name, "Renamed");

        let outcome = pending.commit(&backend).await;
        assert!(matches!(outcome, Outcome::Failed { .. }));
        let err = store.settle(outcome).unwrap_err();

        assert_eq!(err.code, ErrorCode::InternalError);
        assert_eq!(store.task(&task.id), Some(&task));
        assert_eq!(store.notices().len(), 1);
    }

    #[tokio::test]
    async fn failed_create_removes_the_optimistic_record() {
        let db = setup_db();
        let mut store = hydrated(&db).await;

        let pending = store.add_task(NewTask::new("missing-list", "Orphan")).unwrap();
        assert_eq!(store.tasks().len(), 1);

        let err = store.settle(pending.commit(&db).await).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
        assert!(store.tasks().is_empty());
        assert_eq!(store.take_notices()[0].code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn failed_delete_restores_task_and_children_in_place() {
        let db = setup_db();
        let inbox = inbox_id(&db);
        let a = db.create_task(&NewTask::new(&inbox, "A")).unwrap();
        let b = db.create_task(&NewTask::new(&inbox, "B")).unwrap();
        let c = db.create_task(&NewTask::new(&inbox, "C")).unwrap();
        db.create_subtask(&a.id, "a1").unwrap();
        db.create_subtask(&b.id, "b1").unwrap();
        db.create_subtask(&b.id, "b2").unwrap();
        let mut store = hydrated(&db).await;
        let tasks_before = store.tasks().to_vec();
        let subtasks_before = store.subtasks().to_vec();
        assert_eq!(tasks_before[0].id, c.id);

        let pending = store.delete_task(&b.id).unwrap();
        assert_eq!(store.tasks().len(), 2);
        assert_eq!(store.subtask_progress(&b.id), (0, 0));

        let backend = FlakyBackend::new(&db, Failure::Execute);
        assert!(store.settle(pending.commit(&backend).await).is_err());

        assert_eq!(store.tasks(), tasks_before.as_slice());
        assert_eq!(store.subtasks(), subtasks_before.as_slice());
    }

    #[tokio::test]
    async fn in_flight_commits_settle_independently() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let mut store = hydrated(&db).await;
        let backend = FlakyBackend::new(&db, Failure::Execute);

        let rename = store
            .update_task(
                &task.id,
                TaskPatch {
                    description: Some("draft".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let label = store.add_label("Work", "#00f", "💼").unwrap();

        let label_outcome = label.commit(&db).await;
        let rename_outcome = rename.commit(&backend).await;

        store.settle(label_outcome).unwrap();
        assert!(store.settle(rename_outcome).is_err());

        assert_eq!(store.labels().len(), 1);
        assert_eq!(store.labels()[0], db.list_labels().unwrap()[0]);
        assert_eq!(store.task(&task.id).unwrap().description, "");
    }
}

mod cascade_tests {
    use super::*;

    #[tokio::test]
    async fn deleting_a_list_drops_its_tasks_and_selection() {
        let db = setup_db();
        let work = db.create_list("Work", "#111", "💼").unwrap();
        let task = db.create_task(&NewTask::new(&work.id, "Report")).unwrap();
        db.create_subtask(&task.id, "Outline").unwrap();
        let kept = db
            .create_task(&NewTask::new(inbox_id(&db), "Groceries"))
            .unwrap();
        let mut store = hydrated(&db).await;
        store.select_list(Some(work.id.clone()));

        let pending = store.delete_list(&work.id).unwrap();
        assert_eq!(store.tasks().len(), 1);
        assert_eq!(store.tasks()[0].id, kept.id);
        assert!(store.subtasks().is_empty());
        assert!(store.selector().selected_list_id.is_none());

        store.settle(pending.commit(&db).await).unwrap();
        assert!(db.get_list(&work.id).unwrap().is_none());
        assert!(db.get_task(&task.id).unwrap().is_none());
    }

    #[tokio::test]
    async fn default_list_is_protected_locally() {
        let db = setup_db();
        let mut store = hydrated(&db).await;

        let err = store.delete_list(&inbox_id(&db)).unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(store.lists().len(), 1);
    }

    #[tokio::test]
    async fn deleting_a_label_clears_associations_and_selection() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let label = db.create_label("Work", "#00f", "💼").unwrap();
        db.create_task_label(&task.id, &label.id).unwrap();
        let mut store = hydrated(&db).await;
        store.select_label(Some(label.id.clone()));

        let pending = store.delete_label(&label.id).unwrap();
        assert!(store.task_labels().is_empty());
        assert!(store.selector().selected_label_id.is_none());

        let backend = FlakyBackend::new(&db, Failure::Execute);
        assert!(store.settle(pending.commit(&backend).await).is_err());
        assert_eq!(store.task_labels().len(), 1);
        assert_eq!(store.selector().selected_label_id.as_deref(), Some(label.id.as_str()));
    }

    #[tokio::test]
    async fn attaching_twice_keeps_one_pair() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let label = db.create_label("Work", "#00f", "💼").unwrap();
        let mut store = hydrated(&db).await;

        let first = store.attach_label(&task.id, &label.id).unwrap();
        let second = store.attach_label(&task.id, &label.id).unwrap();
        assert_eq!(store.task_labels().len(), 1);

        store.settle(first.commit(&db).await).unwrap();
        store.settle(second.commit(&db).await).unwrap();
        assert_eq!(store.task_labels().len(), 1);
        assert_eq!(db.list_task_labels(None).unwrap().len(), 1);
    }
}

mod selector_tests {
    use super::*;

    #[tokio::test]
    async fn visible_tasks_follow_the_store_selector() {
        let db = setup_db();
        let inbox = inbox_id(&db);
        let now = Utc::now();
        let mut dated = NewTask::new(&inbox, "Today");
        dated.date = Some(now.timestamp_millis());
        db.create_task(&dated).unwrap();
        db.create_task(&NewTask::new(&inbox, "Someday")).unwrap();
        let mut store = hydrated(&db).await;
        let engine = ViewEngine::<FuzzyRanker>::default();

        store.set_view(View::Today);
        let names: Vec<&str> = store
            .visible_tasks(&engine, &now)
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Today"]);

        store.set_view(View::All);
        store.set_search_query("someday");
        let names: Vec<&str> = store
            .visible_tasks(&engine, &now)
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(names, vec!["Someday"]);
    }

    #[tokio::test]
    async fn hiding_completed_tasks_after_a_toggle() {
        let db = setup_db();
        let task = db
            .create_task(&NewTask::new(inbox_id(&db), "Write report"))
            .unwrap();
        let mut store = hydrated(&db).await;
        let engine = ViewEngine::<FuzzyRanker>::default();
        store.set_view(View::All);
        store.toggle_show_completed();

        let pending = store.toggle_task_completion(&task.id).unwrap();
        store.settle(pending.commit(&db).await).unwrap();

        assert!(store.visible_tasks(&engine, &Utc::now()).is_empty());
        store.toggle_show_completed();
        assert_eq!(store.visible_tasks(&engine, &Utc::now()).len(), 1);
    }
}
