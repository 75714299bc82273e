//! List CRUD and default-list bootstrap.

use super::{Database, new_id, now_ms, optional};
use crate::error::{RepoError, RepoResult, require_text};
use crate::types::{DEFAULT_LIST_COLOR, DEFAULT_LIST_EMOJI, DEFAULT_LIST_NAME, List, ListPatch};
use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

pub fn parse_list_row(row: &Row) -> rusqlite::Result<List> {
    Ok(List {
        id: row.get("id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        emoji: row.get("emoji")?,
        is_default: row.get("is_default")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

/// Internal helper to get a list using an existing connection (avoids deadlock).
pub(crate) fn get_list_internal(conn: &Connection, list_id: &str) -> RepoResult<Option<List>> {
    optional(conn.query_row(
        "SELECT * FROM lists WHERE id = ?1",
        params![list_id],
        parse_list_row,
    ))
}

fn insert_list(conn: &Connection, list: &List) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO lists (id, name, color, emoji, is_default, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            list.id,
            list.name,
            list.color,
            list.emoji,
            list.is_default,
            list.created_at,
            list.updated_at,
        ],
    )?;
    Ok(())
}

impl Database {
    /// Make sure exactly one default list exists, creating the Inbox if needed.
    pub(crate) fn ensure_default_list(&self) -> RepoResult<List> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let existing = optional(tx.query_row(
                "SELECT * FROM lists WHERE is_default = 1",
                [],
                parse_list_row,
            ))?;

            let list = match existing {
                Some(list) => list,
                None => {
                    let now = now_ms();
                    let list = List {
                        id: new_id(),
                        name: DEFAULT_LIST_NAME.to_string(),
                        color: DEFAULT_LIST_COLOR.to_string(),
                        emoji: DEFAULT_LIST_EMOJI.to_string(),
                        is_default: true,
                        created_at: now,
                        updated_at: now,
                    };
                    insert_list(&tx, &list)?;
                    info!(list_id = %list.id, "Created default list");
                    list
                }
            };

            tx.commit()?;
            Ok(list)
        })
    }

    /// All lists ordered by name.
    pub fn list_lists(&self) -> RepoResult<Vec<List>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM lists ORDER BY name ASC, rowid ASC")?;
            let lists = stmt
                .query_map([], parse_list_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(lists)
        })
    }

    /// Get a list by ID.
    pub fn get_list(&self, list_id: &str) -> RepoResult<Option<List>> {
        self.with_conn(|conn| get_list_internal(conn, list_id))
    }

    /// The permanent default list.
    pub fn default_list(&self) -> RepoResult<List> {
        self.with_conn(|conn| {
            optional(conn.query_row(
                "SELECT * FROM lists WHERE is_default = 1",
                [],
                parse_list_row,
            ))?
            .ok_or_else(|| RepoError::internal("default list is missing"))
        })
    }

    /// Create a user list. User lists are never the default.
    pub fn create_list(&self, name: &str, color: &str, emoji: &str) -> RepoResult<List> {
        require_text("name", Some(name))?;
        require_text("color", Some(color))?;
        require_text("emoji", Some(emoji))?;

        let now = now_ms();
        let list = List {
            id: new_id(),
            name: name.to_string(),
            color: color.to_string(),
            emoji: emoji.to_string(),
            is_default: false,
            created_at: now,
            updated_at: now,
        };

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            insert_list(&tx, &list)?;
            tx.commit()?;
            Ok(())
        })?;

        debug!(list_id = %list.id, name = %list.name, "Created list");
        Ok(list)
    }

    /// Apply a partial update to a list.
    pub fn update_list(&self, list_id: &str, patch: &ListPatch) -> RepoResult<List> {
        patch.validate()?;
        let now = now_ms();

        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let mut list = get_list_internal(&tx, list_id)?
                .ok_or_else(|| RepoError::not_found("List", list_id))?;

            patch.apply(&mut list, now);

            tx.execute(
                "UPDATE lists SET name = ?1, color = ?2, emoji = ?3, updated_at = ?4 WHERE id = ?5",
                params![list.name, list.color, list.emoji, list.updated_at, list.id],
            )?;
            tx.commit()?;
            Ok(list)
        })
    }

    /// Delete a list and, through the schema, all of its tasks.
    pub fn delete_list(&self, list_id: &str) -> RepoResult<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let list = get_list_internal(&tx, list_id)?
                .ok_or_else(|| RepoError::not_found("List", list_id))?;

            if list.is_default {
                return Err(RepoError::forbidden("Cannot delete the inbox list"));
            }

            tx.execute("DELETE FROM lists WHERE id = ?1", params![list_id])?;
            tx.commit()?;
            debug!(list_id = %list_id, "Deleted list");
            Ok(())
        })
    }
}
