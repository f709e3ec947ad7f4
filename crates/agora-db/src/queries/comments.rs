use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::CommentRow;

const COMMENT_SELECT: &str = "SELECT c.id, c.thread_id, c.author_address_id, a.address, a.chain,
            c.parent_id, c.text, c.created_at
     FROM comments c
     LEFT JOIN addresses a ON c.author_address_id = a.id";

impl Database {
    pub fn insert_comment(
        &self,
        id: &str,
        thread_id: &str,
        author_address_id: &str,
        parent_id: Option<&str>,
        text: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, thread_id, author_address_id, parent_id, text)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, thread_id, author_address_id, parent_id, text],
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1 AND c.deleted_at IS NULL", COMMENT_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_comment_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_comments(&self, thread_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE c.thread_id = ?1 AND c.deleted_at IS NULL ORDER BY c.created_at",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([thread_id], map_comment_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn soft_delete_comment(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE comments SET deleted_at = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }
}

fn map_comment_row(row: &rusqlite::Row<'_>) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        thread_id: row.get(1)?,
        author_address_id: row.get(2)?,
        author_address: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        author_chain: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        parent_id: row.get(5)?,
        text: row.get(6)?,
        created_at: row.get(7)?,
    })
}
