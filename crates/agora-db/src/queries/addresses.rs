use anyhow::Result;

use super::{OptionalExt, placeholders};
use crate::Database;
use crate::models::AddressRow;

const ADDRESS_COLUMNS: &str = "id, address, chain, user_id, verification_token, \
     verification_token_expires, verified_at, last_active";

impl Database {
    pub fn create_address(
        &self,
        id: &str,
        address: &str,
        chain: &str,
        user_id: Option<&str>,
        verification_token: &str,
        token_expires: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO addresses
                    (id, address, chain, user_id, verification_token, verification_token_expires)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, address, chain, user_id, verification_token, token_expires],
            )?;
            Ok(())
        })
    }

    pub fn get_address(&self, chain: &str, address: &str) -> Result<Option<AddressRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM addresses WHERE chain = ?1 AND address = ?2",
                ADDRESS_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row([chain, address], map_address_row)
                .optional()?;
            Ok(row)
        })
    }

    pub fn get_address_by_id(&self, id: &str) -> Result<Option<AddressRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM addresses WHERE id = ?1", ADDRESS_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_address_row).optional()?;
            Ok(row)
        })
    }

    pub fn get_addresses_for_user(&self, user_id: &str) -> Result<Vec<AddressRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM addresses WHERE user_id = ?1", ADDRESS_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_address_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Refresh the verification token on an unverified address.
    pub fn reset_verification_token(&self, id: &str, token: &str, expires: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE addresses
                 SET verification_token = ?1, verification_token_expires = ?2
                 WHERE id = ?3",
                rusqlite::params![token, expires, id],
            )?;
            Ok(())
        })
    }

    /// Mark an address verified and attach it to a user.
    pub fn verify_address(&self, id: &str, user_id: &str, verified_at: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE addresses SET user_id = ?1, verified_at = ?2 WHERE id = ?3",
                rusqlite::params![user_id, verified_at, id],
            )?;
            Ok(())
        })
    }

    pub fn touch_address(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE addresses SET last_active = datetime('now') WHERE id = ?1",
                [id],
            )?;
            Ok(())
        })
    }

    /// Move a set of addresses from one user to another. Only rows actually
    /// owned by `from_user_id` move; returns the number moved.
    pub fn reassign_addresses(
        &self,
        address_ids: &[String],
        from_user_id: &str,
        to_user_id: &str,
    ) -> Result<usize> {
        if address_ids.is_empty() {
            return Ok(0);
        }
        self.with_conn_mut(|conn| {
            let sql = format!(
                "UPDATE addresses SET user_id = ?1
                 WHERE user_id = ?2 AND id IN ({})",
                shifted_placeholders(address_ids.len(), 3)
            );
            let mut params: Vec<&dyn rusqlite::types::ToSql> =
                vec![&to_user_id as &dyn rusqlite::types::ToSql, &from_user_id];
            params.extend(address_ids.iter().map(|id| id as &dyn rusqlite::types::ToSql));
            let moved = conn.execute(&sql, params.as_slice())?;
            Ok(moved)
        })
    }

    /// Resolve which users own any of the given on-chain addresses.
    /// Used by the fan-out pipeline for include/exclude lists.
    pub fn user_ids_owning_addresses(&self, addresses: &[String]) -> Result<Vec<String>> {
        if addresses.is_empty() {
            return Ok(vec![]);
        }
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT DISTINCT user_id FROM addresses
                 WHERE user_id IS NOT NULL AND address IN ({})",
                placeholders(addresses.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = addresses
                .iter()
                .map(|a| a as &dyn rusqlite::types::ToSql)
                .collect();
            let rows = stmt
                .query_map(params.as_slice(), |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_address_row(row: &rusqlite::Row<'_>) -> std::result::Result<AddressRow, rusqlite::Error> {
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
}

/// `?N` placeholders starting at `start` instead of 1.
fn shifted_placeholders(n: usize, start: usize) -> String {
    (start..start + n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
