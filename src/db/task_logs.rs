//! Append-only task audit trail.

use super::{Database, new_id};
use crate::error::RepoResult;
use crate::types::{TaskLog, TaskLogAction};
use rusqlite::{Connection, Row, params};

pub fn parse_task_log_row(row: &Row) -> rusqlite::Result<TaskLog> {
    let action: String = row.get("action")?;
    Ok(TaskLog {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        // Only this module writes the column.
        action: TaskLogAction::parse(&action).unwrap_or(TaskLogAction::Updated),
        changes: row.get("changes")?,
        created_at: row.get("created_at")?,
    })
}

/// Record a change inside the caller's transaction.
pub(crate) fn append_task_log(
    conn: &Connection,
    task_id: &str,
    action: TaskLogAction,
    changes: &str,
    now: i64,
) -> RepoResult<TaskLog> {
    let log = TaskLog {
        id: new_id(),
        task_id: task_id.to_string(),
        action,
        changes: changes.to_string(),
        created_at: now,
    };
    conn.execute(
        "INSERT INTO task_logs (id, task_id, action, changes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![log.id, log.task_id, action.as_str(), log.changes, log.created_at],
    )?;
    Ok(log)
}

impl Database {
    /// A task's audit trail, oldest first.
    pub fn list_task_logs(&self, task_id: &str) -> RepoResult<Vec<TaskLog>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM task_logs WHERE task_id = ?1 ORDER BY created_at ASC, rowid ASC",
            )?;
            let logs = stmt
                .query_map(params![task_id], parse_task_log_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(logs)
        })
    }
}
