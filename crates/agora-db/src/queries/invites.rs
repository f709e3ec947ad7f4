use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::InviteCodeRow;

impl Database {
    pub fn create_invite_code(
        &self,
        code: &str,
        community_id: &str,
        creator_id: &str,
        invited_email: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO invite_codes (code, community_id, creator_id, invited_email)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![code, community_id, creator_id, invited_email],
            )?;
            Ok(())
        })
    }

    pub fn get_invite_code(&self, code: &str) -> Result<Option<InviteCodeRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT code, community_id, creator_id, invited_email, used, created_at
                 FROM invite_codes WHERE code = ?1",
            )?;
            let row = stmt
                .query_row([code], |row| {
                    Ok(InviteCodeRow {
                        code: row.get(0)?,
                        community_id: row.get(1)?,
                        creator_id: row.get(2)?,
                        invited_email: row.get(3)?,
                        used: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    /// Atomically consume an unused invite code. Returns false if the code
    /// was already used (or does not exist).
    pub fn use_invite_code(&self, code: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE invite_codes SET used = 1 WHERE code = ?1 AND used = 0",
                [code],
            )?;
            Ok(changed > 0)
        })
    }
}
