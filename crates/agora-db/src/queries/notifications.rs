use anyhow::Result;

use super::placeholders;
use crate::Database;
use crate::models::NotificationRow;

impl Database {
    #[allow(clippy::too_many_arguments)]
    pub fn insert_notification(
        &self,
        id: &str,
        subscription_id: &str,
        category: &str,
        data: &str,
        chain_event_id: Option<&str>,
        thread_id: Option<&str>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notifications
                    (id, subscription_id, category, data, chain_event_id, thread_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, subscription_id, category, data, chain_event_id, thread_id],
            )?;
            Ok(())
        })
    }

    /// All notifications for a user's subscriptions, unread first then
    /// newest first. Batching into display rows happens above the DB layer.
    pub fn list_notifications_for_user(
        &self,
        user_id: &str,
        limit: u32,
    ) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT n.id, n.subscription_id, n.category, n.data, n.chain_event_id,
                        n.thread_id, n.is_read, n.created_at
                 FROM notifications n
                 JOIN subscriptions s ON n.subscription_id = s.id
                 WHERE s.subscriber_id = ?1
                 ORDER BY n.is_read ASC, n.created_at DESC
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, limit], map_notification_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Mark the given notifications read, restricted to rows the user owns.
    pub fn mark_notifications_read(&self, user_id: &str, ids: &[String]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        self.with_conn_mut(|conn| {
            let sql = format!(
                "UPDATE notifications SET is_read = 1
                 WHERE id IN ({})
                   AND subscription_id IN
                       (SELECT id FROM subscriptions WHERE subscriber_id = ?{})",
                placeholders(ids.len()),
                ids.len() + 1
            );
            let mut params: Vec<&dyn rusqlite::types::ToSql> = ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();
            params.push(&user_id as &dyn rusqlite::types::ToSql);
            let changed = conn.execute(&sql, params.as_slice())?;
            Ok(changed)
        })
    }

    /// Delete the user's read notifications. Returns the number removed.
    pub fn clear_read_notifications(&self, user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM notifications
                 WHERE is_read = 1
                   AND subscription_id IN
                       (SELECT id FROM subscriptions WHERE subscriber_id = ?1)",
                [user_id],
            )?;
            Ok(removed)
        })
    }

    pub fn unread_notification_count(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM notifications n
                 JOIN subscriptions s ON n.subscription_id = s.id
                 WHERE s.subscriber_id = ?1 AND n.is_read = 0",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(count as usize)
        })
    }

    /// Retention pruning: read notifications older than the cutoff go away.
    pub fn prune_read_notifications(&self, older_than_days: u32) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM notifications
                 WHERE is_read = 1
                   AND created_at < datetime('now', '-' || ?1 || ' days')",
                [older_than_days],
            )?;
            Ok(removed)
        })
    }
}

fn map_notification_row(
    row: &rusqlite::Row<'_>,
) -> std::result::Result<NotificationRow, rusqlite::Error> {
    Ok(NotificationRow {
        id: row.get(0)?,
        subscription_id: row.get(1)?,
        category: row.get(2)?,
        data: row.get(3)?,
        chain_event_id: row.get(4)?,
        thread_id: row.get(5)?,
        is_read: row.get(6)?,
        created_at: row.get(7)?,
    })
}
