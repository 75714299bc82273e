//! Label CRUD.

use super::{Database, new_id, now_ms, optional};
use crate::error::{RepoError, RepoResult, require_text};
use crate::types::{Label, LabelPatch};
use rusqlite::{Connection, Row, params};
use tracing::debug;

pub fn parse_label_row(row: &Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        emoji: row.get("emoji")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn get_label_internal(conn: &Connection, label_id: &str) -> RepoResult<Option<Label>> {
    optional(conn.query_row(
        "SELECT * FROM labels WHERE id = ?1",
        params![label_id],
        parse_label_row,
    ))
}

impl Database {
    /// All labels ordered by name.
    pub fn list_labels(&self) -> RepoResult<Vec<Label>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM labels ORDER BY name ASC, rowid ASC")?;
            let labels = stmt
                .query_map([], parse_label_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(labels)
        })
    }

    pub fn get_label(&self, label_id: &str) -> RepoResult<Option<Label>> {
        self.with_conn(|conn| get_label_internal(conn, label_id))
    }

    pub fn create_label(&self, name: &str, color: &str, emoji: &str) -> RepoResult<Label> {
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

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO labels (id, name, color, emoji, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    label.id,
                    label.name,
                    label.color,
                    label.emoji,
                    label.created_at,
                    label.updated_at,
                ],
            )?;
            tx.commit()?;
            Ok(())
        })?;

        debug!(label_id = %label.id, name = %label.name, "Created label");
        Ok(label)
    }

    pub fn update_label(&self, label_id: &str, patch: &LabelPatch) -> RepoResult<Label> {
        patch.validate()?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut label = get_label_internal(&tx, label_id)?
                .ok_or_else(|| RepoError::not_found("Label", label_id))?;

            patch.apply(&mut label, now);

            tx.execute(
                "UPDATE labels SET name = ?1, color = ?2, emoji = ?3, updated_at = ?4 WHERE id = ?5",
                params![label.name, label.color, label.emoji, label.updated_at, label.id],
            )?;
            tx.commit()?;
            Ok(label)
        })
    }

    /// Delete a label; its task associations go with it.
    pub fn delete_label(&self, label_id: &str) -> RepoResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let removed = tx.execute("DELETE FROM labels WHERE id = ?1", params![label_id])?;
            if removed == 0 {
                return Err(RepoError::not_found("Label", label_id));
            }
            tx.commit()?;
            debug!(label_id = %label_id, "Deleted label");
            Ok(())
        })
    }
}
