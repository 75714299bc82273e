//! Task CRUD.
//!
//! Creates and updates write a task log entry in the same transaction as the
//! task row itself.

use super::lists::get_list_internal;
use super::task_logs::append_task_log;
use super::{Database, new_id, now_ms, optional};
use crate::error::{RepoError, RepoResult};
use crate::types::{NewTask, Priority, Task, TaskLogAction, TaskPatch};
use rusqlite::{Connection, Row, params};
use tracing::debug;

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let priority: String = row.get("priority")?;

    Ok(Task {
        id: row.get("id")?,
        list_id: row.get("list_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        date: row.get("date")?,
        deadline: row.get("deadline")?,
        priority: priority.parse().unwrap_or(Priority::None),
        estimated_time: row.get("estimated_time")?,
        actual_time: row.get("actual_time")?,
        completed: row.get("completed")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: &str) -> RepoResult<Option<Task>> {
    optional(conn.query_row(
        "SELECT * FROM tasks WHERE id = ?1",
        params![task_id],
        parse_task_row,
    ))
}

/// Fail with `NotFound` unless the task exists.
pub(crate) fn require_task(conn: &Connection, task_id: &str) -> RepoResult<Task> {
    get_task_internal(conn, task_id)?.ok_or_else(|| RepoError::not_found("Task", task_id))
}

impl Database {
    /// All tasks, newest first, optionally restricted to one list.
    pub fn list_tasks(&self, list_id: Option<&str>) -> RepoResult<Vec<Task>> {
        self.with_conn(|conn| {
            let tasks = match list_id {
                Some(list_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM tasks WHERE list_id = ?1
                         ORDER BY created_at DESC, rowid DESC",
                    )?;
                    stmt.query_map(params![list_id], parse_task_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt =
                        conn.prepare("SELECT * FROM tasks ORDER BY created_at DESC, rowid DESC")?;
                    stmt.query_map([], parse_task_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(tasks)
        })
    }

    /// Get a task by ID.
    pub fn get_task(&self, task_id: &str) -> RepoResult<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Create a new task, logging the typed input as its change record.
    pub fn create_task(&self, input: &NewTask) -> RepoResult<Task> {
        let changes = serde_json::to_string(input)?;
        self.create_task_logged(input, &changes)
    }

    /// Create a new task and store `changes` (the request as received) in
    /// its `created` log entry.
    pub fn create_task_logged(&self, input: &NewTask, changes: &str) -> RepoResult<Task> {
        input.validate()?;
        let now = now_ms();
        let task = input.clone().into_task(new_id(), now)?;

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            if get_list_internal(&tx, &task.list_id)?.is_none() {
                return Err(RepoError::not_found("List", &task.list_id).with_field("listId"));
            }

            tx.execute(
                "INSERT INTO tasks (
                    id, list_id, name, description, date, deadline, priority,
                    estimated_time, actual_time, completed, completed_at, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    task.id,
                    task.list_id,
                    task.name,
                    task.description,
                    task.date,
                    task.deadline,
                    task.priority.as_str(),
                    task.estimated_time,
                    task.actual_time,
                    task.completed,
                    task.completed_at,
                    task.created_at,
                    task.updated_at,
                ],
            )?;

            append_task_log(&tx, &task.id, TaskLogAction::Created, changes, now)?;

            tx.commit()?;
            Ok(())
        })?;

        debug!(task_id = %task.id, list_id = %task.list_id, "Created task");
        Ok(task)
    }

    /// Apply a partial update to a task and log the patch.
    pub fn update_task(&self, task_id: &str, patch: &TaskPatch) -> RepoResult<Task> {
        let changes = serde_json::to_string(patch)?;
        self.update_task_logged(task_id, patch, &changes)
    }

    /// Apply a partial update, storing `changes` in the `updated` log entry.
    pub fn update_task_logged(
        &self,
        task_id: &str,
        patch: &TaskPatch,
        changes: &str,
    ) -> RepoResult<Task> {
        patch.validate()?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut task = require_task(&tx, task_id)?;

            if let Some(list_id) = &patch.list_id {
                if get_list_internal(&tx, list_id)?.is_none() {
                    return Err(RepoError::not_found("List", list_id).with_field("listId"));
                }
            }

            patch.apply(&mut task, now);

            tx.execute(
                "UPDATE tasks SET
                    list_id = ?1, name = ?2, description = ?3, date = ?4, deadline = ?5,
                    priority = ?6, estimated_time = ?7, actual_time = ?8, completed = ?9,
                    completed_at = ?10, updated_at = ?11
                 WHERE id = ?12",
                params![
                    task.list_id,
                    task.name,
                    task.description,
                    task.date,
                    task.deadline,
                    task.priority.as_str(),
                    task.estimated_time,
                    task.actual_time,
                    task.completed,
                    task.completed_at,
                    task.updated_at,
                    task.id,
                ],
            )?;

            append_task_log(&tx, &task.id, TaskLogAction::Updated, changes, now)?;

            tx.commit()?;
            Ok(task)
        })
    }

    /// Delete a task; subtasks, labels, logs, reminders and attachments cascade.
    pub fn delete_task(&self, task_id: &str) -> RepoResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            if removed == 0 {
                return Err(RepoError::not_found("Task", task_id));
            }
            tx.commit()?;
            debug!(task_id = %task_id, "Deleted task");
            Ok(())
        })
    }
}
