//! Task reminders.

use super::tasks::require_task;
use super::{Database, new_id, now_ms};
use crate::error::{RepoError, RepoResult};
use crate::types::{Reminder, ReminderKind};
use rusqlite::{Row, params};

pub fn parse_reminder_row(row: &Row) -> rusqlite::Result<Reminder> {
    let kind: String = row.get("kind")?;
    Ok(Reminder {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        kind: ReminderKind::parse(&kind).unwrap_or_default(),
        minutes_before: row.get("minutes_before")?,
        created_at: row.get("created_at")?,
    })
}

impl Database {
    pub fn list_reminders(&self, task_id: Option<&str>) -> RepoResult<Vec<Reminder>> {
        self.with_conn(|conn| {
            let reminders = match task_id {
                Some(task_id) => {
                    let mut stmt = conn.prepare(
                        "SELECT * FROM reminders WHERE task_id = ?1
                         ORDER BY minutes_before DESC, rowid ASC",
                    )?;
                    stmt.query_map(params![task_id], parse_reminder_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
                None => {
                    let mut stmt = conn.prepare("SELECT * FROM reminders ORDER BY rowid ASC")?;
                    stmt.query_map([], parse_reminder_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?
                }
            };
            Ok(reminders)
        })
    }

    pub fn create_reminder(
        &self,
        task_id: &str,
        kind: ReminderKind,
        minutes_before: i64,
    ) -> RepoResult<Reminder> {
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

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            require_task(&tx, task_id)?;
            tx.execute(
                "INSERT INTO reminders (id, task_id, kind, minutes_before, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    reminder.id,
                    reminder.task_id,
                    kind.as_str(),
                    reminder.minutes_before,
                    reminder.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })?;

        Ok(reminder)
    }

    pub fn delete_reminder(&self, reminder_id: &str) -> RepoResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed =
                tx.execute("DELETE FROM reminders WHERE id = ?1", params![reminder_id])?;
            if removed == 0 {
                return Err(RepoError::not_found("Reminder", reminder_id));
            }
            tx.commit()?;
            Ok(())
        })
    }
}
