use std::collections::HashMap;

use agora_db::models::NotificationRow;
use agora_types::notifications::PostNotificationData;

/// A display batch: the newest notification plus any older ones on the same
/// subscription and thread root. Chain-event notifications never batch.
pub struct NotificationBatchRows {
    pub head: NotificationRow,
    pub rest: Vec<NotificationRow>,
}

impl NotificationBatchRows {
    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn ids(&self) -> Vec<&str> {
        std::iter::once(self.head.id.as_str())
            .chain(self.rest.iter().map(|row| row.id.as_str()))
            .collect()
    }

    /// Distinct (author_chain, author_address) pairs across the batch, in
    /// batch order. Rows with unparseable payloads contribute nothing.
    pub fn authors(&self) -> Vec<(String, String)> {
        let mut seen = Vec::new();
        for row in std::iter::once(&self.head).chain(self.rest.iter()) {
            let Ok(data) = serde_json::from_str::<PostNotificationData>(&row.data) else {
                continue;
            };
            let pair = (data.author_chain, data.author_address);
            if !seen.contains(&pair) {
                seen.push(pair);
            }
        }
        seen
    }
}

/// Group notification rows into display batches. Rows are expected in
/// display order (unread first, newest first) and batch heads keep that
/// order; later rows with a matching key fold into the earlier batch.
///
/// The batch key is (subscription, thread root, read-state), so a burst of
/// comments on one thread reads as a single row. Read and unread rows never
/// share a batch, and chain-event rows always stand alone.
pub fn batch_rows(rows: Vec<NotificationRow>) -> Vec<NotificationBatchRows> {
    let mut batches: Vec<NotificationBatchRows> = Vec::new();
    let mut index: HashMap<(String, String, bool), usize> = HashMap::new();

    for row in rows {
        let groupable = row.category != "chain-event" && row.thread_id.is_some();
        if groupable {
            let key = (
                row.subscription_id.clone(),
                row.thread_id.clone().unwrap_or_default(),
                row.is_read,
            );
            if let Some(&i) = index.get(&key) {
                batches[i].rest.push(row);
                continue;
            }
            index.insert(key, batches.len());
        }
        batches.push(NotificationBatchRows {
            head: row,
            rest: Vec::new(),
        });
    }

    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(
        id: &str,
        subscription: &str,
        category: &str,
        thread: Option<&str>,
        is_read: bool,
        created_at: &str,
    ) -> NotificationRow {
        NotificationRow {
            id: id.into(),
            subscription_id: subscription.into(),
            category: category.into(),
            data: "{}".into(),
            chain_event_id: None,
            thread_id: thread.map(Into::into),
            is_read,
            created_at: created_at.into(),
        }
    }

    #[test]
    fn same_subscription_and_thread_batches() {
        let rows = vec![
            row("n3", "s1", "new-comment-creation", Some("t1"), false, "2024-01-03 00:00:00"),
            row("n2", "s1", "new-comment-creation", Some("t1"), false, "2024-01-02 00:00:00"),
            row("n1", "s1", "new-comment-creation", Some("t1"), false, "2024-01-01 00:00:00"),
        ];
        let batches = batch_rows(rows);
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 3);
        assert_eq!(batches[0].head.id, "n3");
        assert_eq!(batches[0].ids(), vec!["n3", "n2", "n1"]);
    }

    #[test]
    fn different_threads_do_not_batch() {
        let rows = vec![
            row("n2", "s1", "new-comment-creation", Some("t2"), false, "2024-01-02 00:00:00"),
            row("n1", "s1", "new-comment-creation", Some("t1"), false, "2024-01-01 00:00:00"),
        ];
        let batches = batch_rows(rows);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].head.id, "n2");
        assert_eq!(batches[1].head.id, "n1");
    }

    #[test]
    fn read_and_unread_never_share_a_batch() {
        let rows = vec![
            row("n2", "s1", "new-comment-creation", Some("t1"), false, "2024-01-02 00:00:00"),
            row("n1", "s1", "new-comment-creation", Some("t1"), true, "2024-01-01 00:00:00"),
        ];
        let batches = batch_rows(rows);
        assert_eq!(batches.len(), 2);
        assert!(!batches[0].head.is_read);
        assert!(batches[1].head.is_read);
    }

    #[test]
    fn chain_events_stand_alone() {
        let rows = vec![
            row("n2", "s1", "chain-event", None, false, "2024-01-02 00:00:00"),
            row("n1", "s1", "chain-event", None, false, "2024-01-01 00:00:00"),
        ];
        let batches = batch_rows(rows);
        assert_eq!(batches.len(), 2);
    }

    #[test]
    fn authors_deduplicate_across_batch() {
        let data = |addr: &str| {
            format!(
                r#"{{"created_at":"2024-01-01T00:00:00Z","root_id":"00000000-0000-0000-0000-000000000001",
                   "root_title":"t","root_type":"discussion","comment_id":null,"comment_text":null,
                   "parent_comment_id":null,"chain_id":"edgeware","community_id":null,
                   "author_address":"{}","author_chain":"edgeware"}}"#,
                addr
            )
        };
        let mut r1 = row("n1", "s1", "new-comment-creation", Some("t1"), false, "2024-01-03 00:00:00");
        r1.data = data("0xaaa");
        let mut r2 = row("n2", "s1", "new-comment-creation", Some("t1"), false, "2024-01-02 00:00:00");
        r2.data = data("0xbbb");
        let mut r3 = row("n3", "s1", "new-comment-creation", Some("t1"), false, "2024-01-01 00:00:00");
        r3.data = data("0xaaa");

        let batches = batch_rows(vec![r1, r2, r3]);
        assert_eq!(batches.len(), 1);
        let authors = batches[0].authors();
        assert_eq!(
            authors,
            vec![
                ("edgeware".to_string(), "0xaaa".to_string()),
                ("edgeware".to_string(), "0xbbb".to_string()),
            ]
        );
    }
}
