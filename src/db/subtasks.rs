//! Subtask CRUD.

use super::tasks::require_task;
use super::{Database, new_id, now_ms, optional};
use crate::error::{RepoError, RepoResult, require_text};
use crate::types::{Subtask, SubtaskPatch, SubtaskScope};
use rusqlite::{Connection, Row, params};
use tracing::debug;

pub fn parse_subtask_row(row: &Row) -> rusqlite::Result<Subtask> {
    Ok(Subtask {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        name: row.get("name")?,
        completed: row.get("completed")?,
        completed_at: row.get("completed_at")?,
        created_at: row.get("created_at")?,
    })
}

fn get_subtask_internal(conn: &Connection, subtask_id: &str) -> RepoResult<Option<Subtask>> {
    optional(conn.query_row(
        "SELECT * FROM subtasks WHERE id = ?1",
        params![subtask_id],
        parse_subtask_row,
    ))
}

impl Database {
    /// Subtasks in creation order, for one task or across all of them.
    pub fn list_subtasks(&self, scope: SubtaskScope) -> RepoResult<Vec<Subtask>> {
        self.with_conn(|conn| {
            let subtasks = match &scope {
                SubtaskScope::All => {
                    let mut stmt =
                        conn.prepare("SELECT * FROM subtasks ORDER BY created_at ASC, rowid ASC")?;
                    stmt.query_map([], parse_subtask_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
                SubtaskScope::Task(task_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM subtasks WHERE task_id = ?1
                         ORDER BY created_at ASC, rowid ASC",
                    )?;
                    stmt.query_map(params![task_id], parse_subtask_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(subtasks)
        })
    }

    pub fn get_subtask(&self, subtask_id: &str) -> RepoResult<Option<Subtask>> {
        self.with_conn(|conn| get_subtask_internal(conn, subtask_id))
    }

    pub fn create_subtask(&self, task_id: &str, name: &str) -> RepoResult<Subtask> {
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

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_task(&tx, task_id)?;
            tx.execute(
                "INSERT INTO subtasks (id, task_id, name, completed, completed_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    subtask.id,
                    subtask.task_id,
                    subtask.name,
                    subtask.completed,
                    subtask.completed_at,
                    subtask.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })?;

        debug!(subtask_id = %subtask.id, task_id = %task_id, "Created subtask");
        Ok(subtask)
    }

    pub fn update_subtask(&self, subtask_id: &str, patch: &SubtaskPatch) -> RepoResult<Subtask> {
        patch.validate()?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut subtask = get_subtask_internal(&tx, subtask_id)?
                .ok_or_else(|| RepoError::not_found("Subtask", subtask_id))?;

            patch.apply(&mut subtask, now);

            tx.execute(
                "UPDATE subtasks SET name = ?1, completed = ?2, completed_at = ?3 WHERE id = ?4",
                params![
                    subtask.name,
                    subtask.completed,
                    subtask.completed_at,
                    subtask.id
                ],
            )?;
            tx.commit()?;
            Ok(subtask)
        })
    }

    pub fn delete_subtask(&self, subtask_id: &str) -> RepoResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM subtasks WHERE id = ?1", params![subtask_id])?;
            if removed == 0 {
                return Err(RepoError::not_found("Subtask", subtask_id));
            }
            tx.commit()?;
            Ok(())
        })
    }
}
