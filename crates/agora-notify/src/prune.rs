use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use agora_db::Database;

/// Background task that prunes old read notifications.
///
/// Runs on an interval and deletes read notifications older than the
/// retention window. Unread notifications are never pruned.
pub async fn run_prune_loop(db: Arc<Database>, interval_secs: u64, retention_days: u32) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let db = db.clone();
        let result =
            tokio::task::spawn_blocking(move || db.prune_read_notifications(retention_days)).await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Pruned {} read notifications", count);
                }
            }
            Ok(Err(e)) => warn!("Notification prune error: {}", e),
            Err(e) => warn!("Notification prune task panicked: {}", e),
        }
    }
}
