//! Request handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::server::AppState;
use crate::error::{ErrorCode, RepoError, RepoResult};
use crate::types::{
    Attachment, Label, LabelPatch, List, ListPatch, NewTask, Reminder, ReminderKind, Subtask,
    SubtaskPatch, SubtaskScope, Task, TaskLabel, TaskLog, TaskPatch,
};

type Created<T> = (StatusCode, Json<T>);

fn invalid_body(err: serde_json::Error) -> RepoError {
    RepoError::new(ErrorCode::ValidationError, "Invalid request body")
        .with_details(err.to_string())
}

/// Parse a JSON body, reporting malformed input as a validation failure.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> RepoResult<T> {
    let bytes: &[u8] = if body.is_empty() { b"{}" } else { body.as_ref() };
    serde_json::from_slice(bytes).map_err(invalid_body)
}

/// Parse a JSON body and keep the whole document, unknown keys and nulls
/// included, for the task log.
fn parse_logged_body<T: DeserializeOwned>(body: &Bytes) -> RepoResult<(T, String)> {
    let raw: Value = parse_body(body)?;
    let changes = raw.to_string();
    let input = serde_json::from_value(raw).map_err(invalid_body)?;
    Ok((input, changes))
}

fn created<T>(value: T) -> Created<T> {
    (StatusCode::CREATED, Json(value))
}

#[derive(Debug, Serialize)]
pub(crate) struct Success {
    success: bool,
}

fn success() -> Json<Success> {
    Json(Success { success: true })
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub(crate) async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Body shared by list and label creation.
#[derive(Debug, Default, Deserialize)]
struct NamedBody {
    name: Option<String>,
    color: Option<String>,
    emoji: Option<String>,
}

impl NamedBody {
    fn parts(&self) -> (&str, &str, &str) {
        (
            self.name.as_deref().unwrap_or_default(),
            self.color.as_deref().unwrap_or_default(),
            self.emoji.as_deref().unwrap_or_default(),
        )
    }
}

// Lists

pub(crate) async fn list_lists(State(state): State<AppState>) -> RepoResult<Json<Vec<List>>> {
    Ok(Json(state.db().list_lists()?))
}

pub(crate) async fn create_list(
    State(state): State<AppState>,
    body: Bytes,
) -> RepoResult<Created<List>> {
    let input: NamedBody = parse_body(&body)?;
    let (name, color, emoji) = input.parts();
    Ok(created(state.db().create_list(name, color, emoji)?))
}

pub(crate) async fn get_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<List>> {
    state
        .db()
        .get_list(&id)?
        .map(Json)
        .ok_or_else(|| RepoError::not_found("List", &id))
}

pub(crate) async fn update_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> RepoResult<Json<List>> {
    let patch: ListPatch = parse_body(&body)?;
    Ok(Json(state.db().update_list(&id, &patch)?))
}

pub(crate) async fn delete_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Success>> {
    state.db().delete_list(&id)?;
    Ok(success())
}

// Tasks

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskQuery {
    list_id: Option<String>,
}

pub(crate) async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> RepoResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_tasks(query.list_id.as_deref())?))
}

pub(crate) async fn create_task(
    State(state): State<AppState>,
    body: Bytes,
) -> RepoResult<Created<Task>> {
    let (input, changes): (NewTask, String) = parse_logged_body(&body)?;
    Ok(created(state.db().create_task_logged(&input, &changes)?))
}

pub(crate) async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Task>> {
    state
        .db()
        .get_task(&id)?
        .map(Json)
        .ok_or_else(|| RepoError::not_found("Task", &id))
}

pub(crate) async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> RepoResult<Json<Task>> {
    let (patch, changes): (TaskPatch, String) = parse_logged_body(&body)?;
    Ok(Json(state.db().update_task_logged(&id, &patch, &changes)?))
}

pub(crate) async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Success>> {
    state.db().delete_task(&id)?;
    Ok(success())
}

pub(crate) async fn list_task_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Vec<TaskLog>>> {
    if state.db().get_task(&id)?.is_none() {
        return Err(RepoError::not_found("Task", &id));
    }
    Ok(Json(state.db().list_task_logs(&id)?))
}

// Subtasks

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TaskScopedQuery {
    task_id: Option<String>,
}

pub(crate) async fn list_subtasks(
    State(state): State<AppState>,
    Query(query): Query<TaskScopedQuery>,
) -> RepoResult<Json<Vec<Subtask>>> {
    let task_id = query
        .task_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| RepoError::missing_field("taskId"))?;
    Ok(Json(
        state.db().list_subtasks(SubtaskScope::from_param(&task_id))?,
    ))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubtaskBody {
    task_id: Option<String>,
    name: Option<String>,
}

pub(crate) async fn create_subtask(
    State(state): State<AppState>,
    body: Bytes,
) -> RepoResult<Created<Subtask>> {
    let input: SubtaskBody = parse_body(&body)?;
    Ok(created(state.db().create_subtask(
        input.task_id.as_deref().unwrap_or_default(),
        input.name.as_deref().unwrap_or_default(),
    )?))
}

pub(crate) async fn get_subtask(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Subtask>> {
    state
        .db()
        .get_subtask(&id)?
        .map(Json)
        .ok_or_else(|| RepoError::not_found("Subtask", &id))
}

pub(crate) async fn update_subtask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> RepoResult<Json<Subtask>> {
    let patch: SubtaskPatch = parse_body(&body)?;
    Ok(Json(state.db().update_subtask(&id, &patch)?))
}

pub(crate) async fn delete_subtask(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Success>> {
    state.db().delete_subtask(&id)?;
    Ok(success())
}

// Labels

pub(crate) async fn list_labels(State(state): State<AppState>) -> RepoResult<Json<Vec<Label>>> {
    Ok(Json(state.db().list_labels()?))
}

pub(crate) async fn create_label(
    State(state): State<AppState>,
    body: Bytes,
) -> RepoResult<Created<Label>> {
    let input: NamedBody = parse_body(&body)?;
    let (name, color, emoji) = input.parts();
    Ok(created(state.db().create_label(name, color, emoji)?))
}

pub(crate) async fn get_label(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Label>> {
    state
        .db()
        .get_label(&id)?
        .map(Json)
        .ok_or_else(|| RepoError::not_found("Label", &id))
}

pub(crate) async fn update_label(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> RepoResult<Json<Label>> {
    let patch: LabelPatch = parse_body(&body)?;
    Ok(Json(state.db().update_label(&id, &patch)?))
}

pub(crate) async fn delete_label(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Success>> {
    state.db().delete_label(&id)?;
    Ok(success())
}

// Task/label associations

pub(crate) async fn list_task_labels(
    State(state): State<AppState>,
    Query(query): Query<TaskScopedQuery>,
) -> RepoResult<Json<Vec<TaskLabel>>> {
    Ok(Json(state.db().list_task_labels(query.task_id.as_deref())?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskLabelBody {
    task_id: Option<String>,
    label_id: Option<String>,
}

/// 201 for a new association, 200 when the pair already existed.
pub(crate) async fn create_task_label(
    State(state): State<AppState>,
    body: Bytes,
) -> RepoResult<Created<TaskLabel>> {
    let input: TaskLabelBody = parse_body(&body)?;
    let (pair, was_created) = state.db().create_task_label(
        input.task_id.as_deref().unwrap_or_default(),
        input.label_id.as_deref().unwrap_or_default(),
    )?;
    let status = if was_created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(pair)))
}

pub(crate) async fn delete_task_label(
    State(state): State<AppState>,
    Path((task_id, label_id)): Path<(String, String)>,
) -> RepoResult<Json<Success>> {
    state.db().delete_task_label(&task_id, &label_id)?;
    Ok(success())
}

// Reminders

pub(crate) async fn list_reminders(
    State(state): State<AppState>,
    Query(query): Query<TaskScopedQuery>,
) -> RepoResult<Json<Vec<Reminder>>> {
    Ok(Json(state.db().list_reminders(query.task_id.as_deref())?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReminderBody {
    task_id: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    minutes_before: Option<i64>,
}

pub(crate) async fn create_reminder(
    State(state): State<AppState>,
    body: Bytes,
) -> RepoResult<Created<Reminder>> {
    let input: ReminderBody = parse_body(&body)?;
    let kind = match input.kind.as_deref() {
        None => ReminderKind::default(),
        Some(raw) => ReminderKind::parse(raw).ok_or_else(|| {
            RepoError::invalid_value("type", &format!("unknown reminder type '{}'", raw))
        })?,
    };
    let minutes_before = input
        .minutes_before
        .ok_or_else(|| RepoError::missing_field("minutesBefore"))?;

    Ok(created(state.db().create_reminder(
        input.task_id.as_deref().unwrap_or_default(),
        kind,
        minutes_before,
    )?))
}

pub(crate) async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Success>> {
    state.db().delete_reminder(&id)?;
    Ok(success())
}

// Attachments

pub(crate) async fn list_attachments(
    State(state): State<AppState>,
    Query(query): Query<TaskScopedQuery>,
) -> RepoResult<Json<Vec<Attachment>>> {
    Ok(Json(state.db().list_attachments(query.task_id.as_deref())?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentBody {
    task_id: Option<String>,
    name: Option<String>,
    url: Option<String>,
}

pub(crate) async fn create_attachment(
    State(state): State<AppState>,
    body: Bytes,
) -> RepoResult<Created<Attachment>> {
    let input: AttachmentBody = parse_body(&body)?;
    Ok(created(state.db().create_attachment(
        input.task_id.as_deref().unwrap_or_default(),
        input.name.as_deref().unwrap_or_default(),
        input.url.as_deref().unwrap_or_default(),
    )?))
}

pub(crate) async fn delete_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> RepoResult<Json<Success>> {
    state.db().delete_attachment(&id)?;
    Ok(success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    fn body(value: serde_json::Value) -> Bytes {
        Bytes::from(value.to_string())
    }

    #[tokio::test]
    async fn create_list_answers_created() {
        let state = state();
        let (status, Json(list)) = create_list(
            State(state.clone()),
            body(serde_json::json!({"name": "Work", "color": "#111", "emoji": "💼"})),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert!(!list.is_default);

        let Json(lists) = list_lists(State(state)).await.unwrap();
        assert_eq!(lists.len(), 2);
    }

    #[tokio::test]
    async fn missing_fields_are_validation_errors() {
        let state = state();
        let err = create_list(State(state.clone()), body(serde_json::json!({"name": "Work"})))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let err = create_task(State(state.clone()), body(serde_json::json!({"name": "x"})))
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("listId"));

        let err = create_task(State(state), Bytes::from_static(b"{not json"))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.details.is_some());
    }

    #[tokio::test]
    async fn deleting_inbox_is_rejected_with_bad_request() {
        let state = state();
        let inbox = state.db().default_list().unwrap();
        let err = delete_list(State(state), Path(inbox.id)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let state = state();
        let err = get_task(State(state.clone()), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);

        let err = list_task_logs(State(state), Path("missing".into()))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn task_label_status_reflects_creation() {
        let state = state();
        let inbox = state.db().default_list().unwrap();
        let task = state.db().create_task(&NewTask::new(inbox.id, "Pay rent")).unwrap();
        let label = state.db().create_label("Home", "#0f0", "🏠").unwrap();
        let payload = serde_json::json!({"taskId": task.id, "labelId": label.id});

        let (first, _) = create_task_label(State(state.clone()), body(payload.clone()))
            .await
            .unwrap();
        let (second, Json(pair)) = create_task_label(State(state.clone()), body(payload))
            .await
            .unwrap();
        assert_eq!(first, StatusCode::CREATED);
        assert_eq!(second, StatusCode::OK);
        assert_eq!(pair.label_id, label.id);
        assert_eq!(state.db().list_task_labels(Some(task.id.as_str())).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn subtasks_require_a_scope() {
        let state = state();
        let err = list_subtasks(State(state.clone()), Query(TaskScopedQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("taskId"));

        let Json(all) = list_subtasks(
            State(state),
            Query(TaskScopedQuery {
                task_id: Some("all".into()),
            }),
        )
        .await
        .unwrap();
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn patch_clears_nullable_fields() {
        let state = state();
        let inbox = state.db().default_list().unwrap();
        let mut input = NewTask::new(inbox.id, "Dentist");
        input.date = Some(1_700_000_000_000);
        let task = state.db().create_task(&input).unwrap();

        let Json(updated) = update_task(
            State(state),
            Path(task.id),
            body(serde_json::json!({"date": null})),
        )
        .await
        .unwrap();
        assert!(updated.date.is_none());
        assert_eq!(updated.name, "Dentist");
    }

    #[tokio::test]
    async fn task_log_keeps_the_request_as_sent() {
        let state = state();
        let inbox = state.db().default_list().unwrap();

        let (_, Json(task)) = create_task(
            State(state.clone()),
            body(serde_json::json!({
                "listId": inbox.id,
                "name": "Pay rent",
                "labels": ["home"],
                "date": null
            })),
        )
        .await
        .unwrap();
        update_task(
            State(state.clone()),
            Path(task.id.clone()),
            body(serde_json::json!({"completed": true, "source": "widget"})),
        )
        .await
        .unwrap();

        let Json(logs) = list_task_logs(State(state), Path(task.id)).await.unwrap();
        assert_eq!(logs.len(), 2);

        let created: serde_json::Value = serde_json::from_str(&logs[0].changes).unwrap();
        assert_eq!(created["labels"], serde_json::json!(["home"]));
        assert!(created.get("date").is_some_and(|v| v.is_null()));
        assert_eq!(created["name"], "Pay rent");

        let updated: serde_json::Value = serde_json::from_str(&logs[1].changes).unwrap();
        assert_eq!(updated, serde_json::json!({"completed": true, "source": "widget"}));
    }

    #[tokio::test]
    async fn reminder_type_is_validated() {
        let state = state();
        let inbox = state.db().default_list().unwrap();
        let task = state.db().create_task(&NewTask::new(inbox.id, "Call")).unwrap();

        let err = create_reminder(
            State(state.clone()),
            body(serde_json::json!({"taskId": task.id, "type": "pigeon", "minutesBefore": 5})),
        )
        .await
        .unwrap_err();
        assert_eq!(err.field.as_deref(), Some("type"));

        let (status, Json(reminder)) = create_reminder(
            State(state),
            body(serde_json::json!({"taskId": task.id, "minutesBefore": 10})),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reminder.kind, ReminderKind::Notification);
    }
}
