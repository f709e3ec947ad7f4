use anyhow::Result;

use super::OptionalExt;
use crate::Database;
use crate::models::SubscriptionRow;

const SUBSCRIPTION_COLUMNS: &str = "id, subscriber_id, category, object_id, is_active, \
     immediate_email, chain_id, community_id, thread_id, comment_id, chain_event_type_id, \
     created_at";

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_subscription(
        &self,
        id: &str,
        subscriber_id: &str,
        category: &str,
        object_id: &str,
        immediate_email: bool,
        chain_id: Option<&str>,
        community_id: Option<&str>,
        thread_id: Option<&str>,
        comment_id: Option<&str>,
        chain_event_type_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO subscriptions
                    (id, subscriber_id, category, object_id, immediate_email,
                     chain_id, community_id, thread_id, comment_id, chain_event_type_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id,
                    subscriber_id,
                    category,
                    object_id,
                    immediate_email,
                    chain_id,
                    community_id,
                    thread_id,
                    comment_id,
                    chain_event_type_id
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_subscription(&self, id: &str) -> Result<Option<SubscriptionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM subscriptions WHERE id = ?1",
                SUBSCRIPTION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt.query_row([id], map_subscription_row).optional()?;
            Ok(row)
        })
    }

    pub fn list_subscriptions_for_user(&self, user_id: &str) -> Result<Vec<SubscriptionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM subscriptions WHERE subscriber_id = ?1 ORDER BY created_at DESC",
                SUBSCRIPTION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], map_subscription_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// A user holds at most one subscription per (category, object); creating
    /// the same one twice returns the existing row.
    pub fn find_subscription(
        &self,
        subscriber_id: &str,
        category: &str,
        object_id: &str,
    ) -> Result<Option<SubscriptionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM subscriptions
                 WHERE subscriber_id = ?1 AND category = ?2 AND object_id = ?3",
                SUBSCRIPTION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let row = stmt
                .query_row([subscriber_id, category, object_id], map_subscription_row)
                .optional()?;
            Ok(row)
        })
    }

    /// The fan-out query: every active subscription on (category, object).
    pub fn active_subscriptions_for_object(
        &self,
        category: &str,
        object_id: &str,
    ) -> Result<Vec<SubscriptionRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM subscriptions
                 WHERE category = ?1 AND object_id = ?2 AND is_active = 1",
                SUBSCRIPTION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([category, object_id], map_subscription_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flip is_active. Returns the new state, or None if not found/not owned.
    pub fn toggle_subscription(&self, id: &str, subscriber_id: &str) -> Result<Option<bool>> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE subscriptions SET is_active = NOT is_active
                 WHERE id = ?1 AND subscriber_id = ?2",
                [id, subscriber_id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let active: bool = conn.query_row(
                "SELECT is_active FROM subscriptions WHERE id = ?1",
                [id],
                |row| row.get(0),
            )?;
            Ok(Some(active))
        })
    }

    /// Delete a subscription (and its notifications, via cascade).
    pub fn delete_subscription(&self, id: &str, subscriber_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "DELETE FROM subscriptions WHERE id = ?1 AND subscriber_id = ?2",
                [id, subscriber_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Move subscription ownership during an account merge.
    pub fn reassign_subscriptions(&self, from_user_id: &str, to_user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let moved = conn.execute(
                "UPDATE subscriptions SET subscriber_id = ?1 WHERE subscriber_id = ?2",
                [to_user_id, from_user_id],
            )?;
            Ok(moved)
        })
    }
}

fn map_subscription_row(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<SubscriptionRow, rusqlite::Error> {
    Ok(SubscriptionRow {
        id: row.get(0)?,
        subscriber_id: row.get(1)?,
        category: row.get(2)?,
        object_id: row.get(3)?,
        is_active: row.get(4)?,
        immediate_email: row.get(5)?,
        chain_id: row.get(6)?,
        community_id: row.get(7)?,
        thread_id: row.get(8)?,
        comment_id: row.get(9)?,
        chain_event_type_id: row.get(10)?,
        created_at: row.get(11)?,
    })
}
