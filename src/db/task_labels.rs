//! Task/label associations.
//!
//! The composite primary key makes each pair unique; creating an existing
//! pair hands back the stored association instead of failing.

use super::Database;
use super::labels::get_label_internal;
use super::tasks::require_task;
use crate::error::{RepoError, RepoResult, require_text};
use crate::types::TaskLabel;
use rusqlite::{Row, params};
use tracing::debug;

pub fn parse_task_label_row(row: &Row) -> rusqlite::Result<TaskLabel> {
    Ok(TaskLabel {
        task_id: row.get("task_id")?,
        label_id: row.get("label_id")?,
    })
}

impl Database {
    /// Associations, optionally for one task.
    pub fn list_task_labels(&self, task_id: Option<&str>) -> RepoResult<Vec<TaskLabel>> {
        self.with_conn(|conn| {
            let pairs = match task_id {
                Some(task_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT task_id, label_id FROM task_labels WHERE task_id = ?1 ORDER BY rowid",
                    )?;
                    stmt.query_map(params![task_id], parse_task_label_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt =
                        conn.prepare("SELECT task_id, label_id FROM task_labels ORDER BY rowid")?;
                    stmt.query_map([], parse_task_label_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(pairs)
        })
    }

    /// Attach a label to a task.
    ///
    /// Returns the association and whether it was newly inserted.
    pub fn create_task_label(&self, task_id: &str, label_id: &str) -> RepoResult<(TaskLabel, bool)> {
        require_text("taskId", Some(task_id))?;
        require_text("labelId", Some(label_id))?;

        let pair = TaskLabel {
            task_id: task_id.to_string(),
            label_id: label_id.to_string(),
        };

        let created = self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_task(&tx, task_id)?;
            if get_label_internal(&tx, label_id)?.is_none() {
                return Err(RepoError::not_found("Label", label_id).with_field("labelId"));
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO task_labels (task_id, label_id) VALUES (?1, ?2)",
                params![task_id, label_id],
            )?;
            tx.commit()?;
            Ok(inserted > 0)
        })?;

        debug!(task_id = %task_id, label_id = %label_id, created, "Attached label");
        Ok((pair, created))
    }

    /// Detach a label from a task. Returns false when the pair did not exist.
    pub fn delete_task_label(&self, task_id: &str, label_id: &str) -> RepoResult<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute(
                "DELETE FROM task_labels WHERE task_id = ?1 AND label_id = ?2",
                params![task_id, label_id],
            )?;
            tx.commit()?;
            Ok(removed > 0)
        })
    }
}
