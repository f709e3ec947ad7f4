use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::{ChainEventRow, ChainEventTypeRow};

impl Database {
    /// Event types are created lazily on first sight of a kind.
    pub fn get_or_create_event_type(
        &self,
        id: &str,
        chain: &str,
        event_name: &str,
    ) -> Result<ChainEventTypeRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO chain_event_types (id, chain, event_name)
                 VALUES (?1, ?2, ?3)",
                rusqlite::params![id, chain, event_name],
            )?;
            let row = conn.query_row(
                "SELECT id, chain, event_name FROM chain_event_types WHERE id = ?1",
                [id],
                |row| {
                    Ok(ChainEventTypeRow {
                        id: row.get(0)?,
                        chain: row.get(1)?,
                        event_name: row.get(2)?,
                    })
                },
            )?;
            Ok(row)
        })
    }

    pub fn get_event_type(&self, id: &str) -> Result<Option<ChainEventTypeRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, chain, event_name FROM chain_event_types WHERE id = ?1")?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(ChainEventTypeRow {
                        id: row.get(0)?,
                        chain: row.get(1)?,
                        event_name: row.get(2)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Idempotent insert: a replay of the same (type, block, data) is
    /// ignored and the existing row is returned with `created = false`.
    pub fn insert_chain_event(
        &self,
        id: &str,
        chain_event_type_id: &str,
        block_number: u64,
        event_data: &str,
    ) -> Result<(ChainEventRow, bool)> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO chain_events (id, chain_event_type_id, block_number, event_data)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, chain_event_type_id, block_number as i64, event_data],
            )?;

            let row = conn.query_row(
                "SELECT id, chain_event_type_id, block_number, event_data, created_at
                 FROM chain_events
                 WHERE chain_event_type_id = ?1 AND block_number = ?2 AND event_data = ?3",
                rusqlite::params![chain_event_type_id, block_number as i64, event_data],
                map_chain_event_row,
            )?;

            Ok((row, inserted > 0))
        })
    }
}

fn map_chain_event_row(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<ChainEventRow, rusqlite::Error> {
    Ok(ChainEventRow {
        id: row.get(0)?,
        chain_event_type_id: row.get(1)?,
        block_number: row.get::<_, i64>(2)? as u64,
        event_data: row.get(3)?,
        created_at: row.get(4)?,
    })
}
