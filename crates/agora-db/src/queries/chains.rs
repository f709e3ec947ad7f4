use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::ChainRow;

const CHAIN_COLUMNS: &str = "id, name, network, base, symbol, description, website, \
     discord, telegram, github, icon_url, active";

impl Database {
    pub fn get_chain(&self, id: &str) -> Result<Option<ChainRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM chains WHERE id = ?1", CHAIN_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_chain_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_chains(&self) -> Result<Vec<ChainRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM chains WHERE active = 1 ORDER BY id", CHAIN_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_chain_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn create_chain(
        &self,
        id: &str,
        name: &str,
        network: &str,
        base: &str,
        symbol: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO chains (id, name, network, base, symbol) VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, name, network, base, symbol],
            )?;
            Ok(())
        })
    }
}

fn map_chain_row(row: &rusqlite::Row<'_>) -> std::result::Result<ChainRow, rusqlite::Error> {
    Ok(ChainRow {
        id: row.get(0)?,
        name: row.get(1)?,
        network: row.get(2)?,
        base: row.get(3)?,
        symbol: row.get(4)?,
        description: row.get(5)?,
        website: row.get(6)?,
        discord: row.get(7)?,
        telegram: row.get(8)?,
        github: row.get(9)?,
        icon_url: row.get(10)?,
        active: row.get(11)?,
    })
}
