//! Task attachments (named links).

use super::tasks::require_task;
use super::{Database, new_id, now_ms};
use crate::error::{RepoError, RepoResult, require_text};
use crate::types::Attachment;
use rusqlite::{Row, params};

pub fn parse_attachment_row(row: &Row) -> rusqlite::Result<Attachment> {
    Ok(Attachment {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        name: row.get("name")?,
        url: row.get("url")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    /// Attachments in the order they were added, optionally for one task.
    pub fn list_attachments(&self, task_id: Option<&str>) -> RepoResult<Vec<Attachment>> {
        self.with_conn(|conn| {
            let attachments = match task_id {
                Some(task_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM attachments WHERE task_id = ?1
                         ORDER BY created_at ASC, rowid ASC",
                    )?;
                    stmt.query_map(params![task_id], parse_attachment_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt = conn
                        .prepare("SELECT * FROM attachments ORDER BY created_at ASC, rowid ASC")?;
                    stmt.query_map([], parse_attachment_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(attachments)
        })
    }

    pub fn create_attachment(&self, task_id: &str, name: &str, url: &str) -> RepoResult<Attachment> {
        require_text("name", Some(name))?;
        require_text("url", Some(url))?;

        let attachment = Attachment {
            id: new_id(),
            task_id: task_id.to_string(),
            name: name.to_string(),
            url: url.to_string(),
            created_at: now_ms(),
        };

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_task(&tx, task_id)?;
            tx.execute(
                "INSERT INTO attachments (id, task_id, name, url, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    attachment.id,
                    attachment.task_id,
                    attachment.name,
                    attachment.url,
                    attachment.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })?;

        Ok(attachment)
    }

    pub fn delete_attachment(&self, attachment_id: &str) -> RepoResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed =
                tx.execute("DELETE FROM attachments WHERE id = ?1", params![attachment_id])?;
            if removed == 0 {
                return Err(RepoError::not_found("Attachment", attachment_id));
            }
            tx.commit()?;
            Ok(())
        })
    }
}
