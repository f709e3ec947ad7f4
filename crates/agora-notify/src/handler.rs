use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::{error, info, trace};
use uuid::Uuid;

use agora_types::notifications::ChainEventNotificationData;

use crate::Notifier;
use crate::labeler;

/// Outcome of ingesting one decoded chain event.
pub struct IngestOutcome {
    pub chain_event_id: Uuid,
    /// False when this exact event was already persisted; replays never
    /// re-notify.
    pub created: bool,
    pub notifications_emitted: usize,
}

/// Transforms decoded chain events into persisted rows and notifications.
pub struct ChainEventHandler {
    notifier: Notifier,
    /// Event kinds to persist but never notify on (high-volume staking
    /// events like reward/bonded).
    excluded_kinds: Vec<String>,
}

impl ChainEventHandler {
    pub fn new(notifier: Notifier, excluded_kinds: Vec<String>) -> Self {
        Self {
            notifier,
            excluded_kinds,
        }
    }

    /// Handle one decoded event: resolve its type (created lazily on first
    /// sight), persist it idempotently, then fan out notifications.
    ///
    /// Fan-out failures are logged and swallowed; an event is never
    /// re-ingested because notification generation failed.
    pub async fn handle(
        &self,
        chain: &str,
        kind: &str,
        block_number: u64,
        data: Value,
        exclude_addresses: &[String],
        include_addresses: &[String],
    ) -> Result<IngestOutcome> {
        let db = self.notifier.db().clone();

        let chain_row = db
            .get_chain(chain)?
            .with_context(|| format!("Unknown chain: {}", chain))?;
        if !chain_row.active {
            bail!("Chain {} is not active", chain);
        }

        let event_type_id = format!("{}-{}", chain, kind);
        let event_type = db.get_or_create_event_type(&event_type_id, chain, kind)?;

        let event_data = serde_json::to_string(&data)?;
        let (event_row, created) = db.insert_chain_event(
            &Uuid::new_v4().to_string(),
            &event_type.id,
            block_number,
            &event_data,
        )?;
        let chain_event_id: Uuid = event_row.id.parse()?;

        if !created {
            trace!("Duplicate chain event at block {} on {}, skipping", block_number, chain);
            return Ok(IngestOutcome {
                chain_event_id,
                created: false,
                notifications_emitted: 0,
            });
        }

        if self.excluded_kinds.iter().any(|k| k == kind) {
            trace!("Skipping excluded event kind {} on {}", kind, chain);
            return Ok(IngestOutcome {
                chain_event_id,
                created: true,
                notifications_emitted: 0,
            });
        }

        let label = labeler::label_event(&chain_row.network, chain, &data);
        let payload = serde_json::to_value(ChainEventNotificationData {
            chain_event_id,
            chain_event_type_id: event_type.id.clone(),
            chain_id: chain.to_string(),
            block_number,
            event_data: data,
        })?;

        let notifications_emitted = match self
            .notifier
            .emit_chain_event_notifications(
                &event_type.id,
                &event_row.id,
                payload,
                label,
                exclude_addresses,
                include_addresses,
            )
            .await
        {
            Ok(count) => {
                info!("Emitted {} notifications for {}", count, event_type.id);
                count
            }
            Err(e) => {
                error!("Failed to generate notifications: {}", e);
                0
            }
        };

        Ok(IngestOutcome {
            chain_event_id,
            created: true,
            notifications_emitted,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use agora_db::Database;
    use agora_gateway::dispatcher::Dispatcher;
    use serde_json::json;

    fn handler_with_db() -> (ChainEventHandler, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Notifier::new(db.clone(), Dispatcher::new());
        (ChainEventHandler::new(notifier, vec!["reward".into()]), db)
    }

    fn subscribe_to_event_type(db: &Database, user: &str, event_type_id: &str) {
        db.insert_subscription(
            &Uuid::new_v4().to_string(),
            user,
            "chain-event",
            event_type_id,
            false,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();
    }

    fn seed_user(db: &Database, username: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.create_user(&id, username, "hash", None).unwrap();
        id
    }

    #[tokio::test]
    async fn ingest_creates_type_event_and_notification() {
        let (handler, db) = handler_with_db();
        let alice = seed_user(&db, "alice");
        // The subscription can exist before the event type row does;
        // matching is by object id string.
        subscribe_to_event_type(&db, &alice, "edgeware-democracy-started");

        let outcome = handler
            .handle(
                "edgeware",
                "democracy-started",
                100,
                json!({"kind": "democracy-started", "referendumIndex": 3}),
                &[],
                &[],
            )
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.notifications_emitted, 1);
        assert_eq!(db.unread_notification_count(&alice).unwrap(), 1);
        assert!(db.get_event_type("edgeware-democracy-started").unwrap().is_some());
    }

    #[tokio::test]
    async fn replay_does_not_renotify() {
        let (handler, db) = handler_with_db();
        let alice = seed_user(&db, "alice");
        subscribe_to_event_type(&db, &alice, "edgeware-democracy-passed");

        let data = json!({"kind": "democracy-passed", "referendumIndex": 7});
        let first = handler
            .handle("edgeware", "democracy-passed", 200, data.clone(), &[], &[])
            .await
            .unwrap();
        let replay = handler
            .handle("edgeware", "democracy-passed", 200, data, &[], &[])
            .await
            .unwrap();

        assert!(first.created);
        assert!(!replay.created);
        assert_eq!(replay.chain_event_id, first.chain_event_id);
        assert_eq!(replay.notifications_emitted, 0);
        assert_eq!(db.unread_notification_count(&alice).unwrap(), 1);
    }

    #[tokio::test]
    async fn excluded_kinds_persist_without_notifying() {
        let (handler, db) = handler_with_db();
        let alice = seed_user(&db, "alice");
        subscribe_to_event_type(&db, &alice, "edgeware-reward");

        let outcome = handler
            .handle(
                "edgeware",
                "reward",
                300,
                json!({"kind": "reward", "amount": "100 EDG"}),
                &[],
                &[],
            )
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.notifications_emitted, 0);
        assert_eq!(db.unread_notification_count(&alice).unwrap(), 0);
    }

    #[tokio::test]
    async fn unknown_chain_is_rejected() {
        let (handler, _db) = handler_with_db();
        let result = handler
            .handle("unknown-chain", "reward", 1, json!({}), &[], &[])
            .await;
        assert!(result.is_err());
    }
}
