use anyhow::Result;

use super::{OptionalExt, placeholders};
use crate::Database;
use crate::models::{AddressRow, ThreadRow};

// JOIN addresses to fetch the author's display address in a single query
const THREAD_SELECT: &str = "SELECT t.id, t.author_address_id, a.address, a.chain, t.community_id,
            t.chain_id, t.title, t.body, t.kind, t.stage, t.url, t.read_only,
            t.pinned, t.version_history, t.created_at, t.updated_at
     FROM threads t
     LEFT JOIN addresses a ON t.author_address_id = a.id";

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_thread(
        &self,
        id: &str,
        author_address_id: &str,
        community_id: Option<&str>,
        chain_id: Option<&str>,
        title: &str,
        body: &str,
        kind: &str,
        stage: &str,
        url: Option<&str>,
        read_only: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO threads
                    (id, author_address_id, community_id, chain_id, title, body, kind, stage, url, read_only)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id,
                    author_address_id,
                    community_id,
                    chain_id,
                    title,
                    body,
                    kind,
                    stage,
                    url,
                    read_only
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_thread(&self, id: &str) -> Result<Option<ThreadRow>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE t.id = ?1 AND t.deleted_at IS NULL", THREAD_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_thread_row).optional()?;
            Ok(row)
        })
    }

    /// Threads in a community, newest first, with cursor pagination via the
    /// `created_at` of the oldest thread from the previous page. Pinned
    /// threads sort ahead of everything on the first page and are excluded
    /// from cursored pages so they never repeat.
    pub fn list_threads(
        &self,
        community_id: &str,
        limit: u32,
        before: Option<&str>,
    ) -> Result<Vec<ThreadRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE t.community_id = ?1 AND t.deleted_at IS NULL
                   AND (?2 IS NULL OR (t.pinned = 0 AND t.created_at < ?2))
                 ORDER BY t.pinned DESC, t.created_at DESC
                 LIMIT ?3",
                THREAD_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![community_id, before, limit], map_thread_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn recent_threads(&self, limit: u32) -> Result<Vec<ThreadRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE t.deleted_at IS NULL ORDER BY t.created_at DESC LIMIT ?1",
                THREAD_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], map_thread_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Apply an edit, pushing the previous body onto version_history.
    pub fn update_thread(
        &self,
        id: &str,
        title: Option<&str>,
        body: Option<&str>,
        stage: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE threads SET
                    version_history = json_insert(version_history, '$[#]',
                        json_object('title', title, 'body', body, 'edited_at', datetime('now'))),
                    title = COALESCE(?1, title),
                    body = COALESCE(?2, body),
                    stage = COALESCE(?3, stage),
                    updated_at = datetime('now')
                 WHERE id = ?4 AND deleted_at IS NULL",
                rusqlite::params![title, body, stage, id],
            )?;
            Ok(())
        })
    }

    pub fn soft_delete_thread(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE threads SET deleted_at = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    // -- Collaborations --

    pub fn add_collaborator(&self, thread_id: &str, address_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO collaborations (address_id, thread_id) VALUES (?1, ?2)",
                rusqlite::params![address_id, thread_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_collaborators(&self, thread_id: &str) -> Result<Vec<AddressRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.address, a.chain, a.user_id, a.verification_token,
                        a.verification_token_expires, a.verified_at, a.last_active
                 FROM collaborations c
                 JOIN addresses a ON c.address_id = a.id
                 WHERE c.thread_id = ?1",
            )?;
            let rows = stmt
                .query_map([thread_id], |row| {
                    Ok(AddressRow {
                        id: row.get(0)?,
                        address: row.get(1)?,
                        chain: row.get(2)?,
                        user_id: row.get(3)?,
                        verification_token: row.get(4)?,
                        verification_token_expires: row.get(5)?,
                        verified_at: row.get(6)?,
                        last_active: row.get(7)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn is_collaborator(&self, thread_id: &str, address_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM collaborations WHERE thread_id = ?1 AND address_id = ?2",
                    [thread_id, address_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Batch comment counts for a page of threads.
    pub fn comment_counts_for_threads(&self, thread_ids: &[String]) -> Result<Vec<(String, usize)>> {
        if thread_ids.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT thread_id, COUNT(*) FROM comments
                 WHERE deleted_at IS NULL AND thread_id IN ({})
                 GROUP BY thread_id",
                placeholders(thread_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = thread_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_thread_row(row: &rusqlite::Row<'_>) -> std::result::Result<ThreadRow, rusqlite::Error> {
    Ok(ThreadRow {
        id: row.get(0)?,
        author_address_id: row.get(1)?,
        author_address: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        author_chain: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        community_id: row.get(4)?,
        chain_id: row.get(5)?,
        title: row.get(6)?,
        body: row.get(7)?,
        kind: row.get(8)?,
        stage: row.get(9)?,
        url: row.get(10)?,
        read_only: row.get(11)?,
        pinned: row.get(12)?,
        version_history: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}
