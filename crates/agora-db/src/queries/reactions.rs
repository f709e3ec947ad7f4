use anyhow::Result;

use super::{OptionalExt, placeholders};
use crate::Database;
use crate::models::ReactionRow;

impl Database {
    /// Toggle a reaction: removes if it exists, inserts if not.
    /// Exactly one of thread_id / comment_id is set.
    /// Returns (added, Option<id>) — added=true means inserted.
    pub fn toggle_reaction(
        &self,
        id: &str,
        address_id: &str,
        thread_id: Option<&str>,
        comment_id: Option<&str>,
        reaction: &str,
    ) -> Result<(bool, Option<String>)> {
        self.with_conn_mut(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM reactions
                     WHERE address_id = ?1
                       AND COALESCE(thread_id, '') = COALESCE(?2, '')
                       AND COALESCE(comment_id, '') = COALESCE(?3, '')
                       AND reaction = ?4",
                    rusqlite::params![address_id, thread_id, comment_id, reaction],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM reactions WHERE id = ?1", [&existing_id])?;
                Ok((false, Some(existing_id)))
            } else {
                conn.execute(
                    "INSERT INTO reactions (id, address_id, thread_id, comment_id, reaction)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    rusqlite::params![id, address_id, thread_id, comment_id, reaction],
                )?;
                Ok((true, Some(id.to_string())))
            }
        })
    }

    pub fn get_reactions_for_thread(&self, thread_id: &str) -> Result<Vec<ReactionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, address_id, thread_id, comment_id, reaction, created_at
                 FROM reactions WHERE thread_id = ?1",
            )?;
            let rows = stmt
                .query_map([thread_id], map_reaction_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch reactions for a set of comment IDs.
    pub fn get_reactions_for_comments(&self, comment_ids: &[String]) -> Result<Vec<ReactionRow>> {
        if comment_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT id, address_id, thread_id, comment_id, reaction, created_at
                 FROM reactions WHERE comment_id IN ({})",
                placeholders(comment_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = comment_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();
            let rows = stmt
                .query_map(params.as_slice(), map_reaction_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_reaction_row(row: &rusqlite::Row<'_>) -> std::result::Result<ReactionRow, rusqlite::Error> {
    Ok(ReactionRow {
        id: row.get(0)?,
        address_id: row.get(1)?,
        thread_id: row.get(2)?,
        comment_id: row.get(3)?,
        reaction: row.get(4)?,
        created_at: row.get(5)?,
    })
}
