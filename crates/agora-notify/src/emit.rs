use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use tracing::{debug, error};
use uuid::Uuid;

use agora_db::Database;
use agora_gateway::dispatcher::Dispatcher;
use agora_types::events::GatewayEvent;
use agora_types::notifications::{ChainEventLabel, NotificationCategory, PostNotificationData};

use crate::webhooks;

/// Fan-out engine: locates subscriptions, creates notification rows, and
/// pushes them to connected clients. One instance is shared by all route
/// handlers and the chain-event pipeline.
#[derive(Clone)]
pub struct Notifier {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    http: reqwest::Client,
}

/// A single created notification, for gateway push.
struct Emitted {
    notification_id: Uuid,
    subscription_id: Uuid,
    subscriber_id: Uuid,
}

impl Notifier {
    pub fn new(db: Arc<Database>, dispatcher: Dispatcher) -> Self {
        Self {
            db,
            dispatcher,
            http: reqwest::Client::new(),
        }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Emit notifications for a forum event (thread/comment/reaction/
    /// mention/collaboration). The author's own addresses go in
    /// `exclude_addresses` so actors never notify themselves; mention
    /// notifications instead pass the mentioned users' addresses in
    /// `include_addresses`.
    pub async fn emit_post_notifications(
        &self,
        category: NotificationCategory,
        object_id: &str,
        data: &PostNotificationData,
        exclude_addresses: &[String],
        include_addresses: &[String],
    ) -> Result<usize> {
        let payload = serde_json::to_value(data)?;
        let thread_id = data.root_id.to_string();

        let emitted = self
            .emit(
                category,
                object_id.to_string(),
                payload.clone(),
                None,
                Some(thread_id),
                exclude_addresses.to_vec(),
                include_addresses.to_vec(),
            )
            .await?;

        // Community webhooks are best effort and never block the request
        if let Some(community_id) = &data.community_id {
            self.fire_community_webhook(community_id, category, payload);
        }

        Ok(emitted)
    }

    /// Emit notifications for an ingested chain event.
    pub async fn emit_chain_event_notifications(
        &self,
        chain_event_type_id: &str,
        chain_event_id: &str,
        payload: serde_json::Value,
        label: ChainEventLabel,
        exclude_addresses: &[String],
        include_addresses: &[String],
    ) -> Result<usize> {
        self.emit(
            NotificationCategory::ChainEvent,
            chain_event_type_id.to_string(),
            payload,
            Some((chain_event_id.to_string(), label)),
            None,
            exclude_addresses.to_vec(),
            include_addresses.to_vec(),
        )
        .await
    }

    /// Core fan-out. Matching, filtering, and row creation run on the
    /// blocking pool; gateway push happens afterwards on the async side.
    #[allow(clippy::too_many_arguments)]
    async fn emit(
        &self,
        category: NotificationCategory,
        object_id: String,
        payload: serde_json::Value,
        chain_event: Option<(String, ChainEventLabel)>,
        thread_id: Option<String>,
        exclude_addresses: Vec<String>,
        include_addresses: Vec<String>,
    ) -> Result<usize> {
        let db = self.db.clone();
        let payload_str = serde_json::to_string(&payload)?;
        let chain_event_id = chain_event.as_ref().map(|(id, _)| id.clone());
        let object = object_id.clone();

        let emitted: Vec<Emitted> = tokio::task::spawn_blocking(move || {
            let subscriptions =
                db.active_subscriptions_for_object(category.as_str(), &object_id)?;

            let excluded: HashSet<String> =
                db.user_ids_owning_addresses(&exclude_addresses)?.into_iter().collect();
            let included: Option<HashSet<String>> = if include_addresses.is_empty() {
                None
            } else {
                Some(db.user_ids_owning_addresses(&include_addresses)?.into_iter().collect())
            };

            let mut seen_subscribers: HashSet<String> = HashSet::new();
            let mut emitted = Vec::new();

            for sub in subscriptions {
                if excluded.contains(&sub.subscriber_id) {
                    continue;
                }
                if let Some(included) = &included {
                    if !included.contains(&sub.subscriber_id) {
                        continue;
                    }
                }
                // At most one notification per subscriber per emission, even
                // when several of their subscriptions match.
                if !seen_subscribers.insert(sub.subscriber_id.clone()) {
                    continue;
                }

                let notification_id = Uuid::new_v4();
                if let Err(e) = db.insert_notification(
                    &notification_id.to_string(),
                    &sub.id,
                    category.as_str(),
                    &payload_str,
                    chain_event_id.as_deref(),
                    thread_id.as_deref(),
                ) {
                    // Per-row failures are logged and skipped; the rest of
                    // the fan-out continues.
                    error!("Failed to create notification for {}: {}", sub.subscriber_id, e);
                    continue;
                }

                let (Ok(subscription_id), Ok(subscriber_id)) =
                    (sub.id.parse::<Uuid>(), sub.subscriber_id.parse::<Uuid>())
                else {
                    continue;
                };
                emitted.push(Emitted {
                    notification_id,
                    subscription_id,
                    subscriber_id,
                });
            }

            Ok::<_, anyhow::Error>(emitted)
        })
        .await??;

        let label = chain_event.map(|(_, label)| label);
        let created_at = Utc::now();
        for e in &emitted {
            self.dispatcher
                .send_to_user(
                    e.subscriber_id,
                    GatewayEvent::Notification {
                        notification_id: e.notification_id,
                        subscription_id: e.subscription_id,
                        category,
                        data: payload.clone(),
                        label: label.clone(),
                        created_at,
                    },
                )
                .await;
        }

        debug!("Emitted {} notifications for {} {}", emitted.len(), category, object);
        Ok(emitted.len())
    }

    fn fire_community_webhook(
        &self,
        community_id: &str,
        category: NotificationCategory,
        payload: serde_json::Value,
    ) {
        let url = match self.db.community_webhook_url(community_id) {
            Ok(Some(url)) => url,
            Ok(None) => return,
            Err(e) => {
                error!("Webhook lookup failed for {}: {}", community_id, e);
                return;
            }
        };

        let client = self.http.clone();
        let body = serde_json::json!({
            "category": category.as_str(),
            "data": payload,
        });
        tokio::spawn(async move {
            webhooks::deliver(&client, &url, &body).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notifier() -> (Notifier, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let notifier = Notifier::new(db.clone(), Dispatcher::new());
        (notifier, db)
    }

    fn seed_user_with_address(db: &Database, username: &str, address: &str) -> String {
        let user_id = Uuid::new_v4().to_string();
        db.create_user(&user_id, username, "hash", None).unwrap();
        let address_id = Uuid::new_v4().to_string();
        db.create_address(
            &address_id,
            address,
            "edgeware",
            Some(&user_id),
            "token",
            "2099-01-01 00:00:00",
        )
        .unwrap();
        user_id
    }

    fn subscribe(db: &Database, user: &str, category: NotificationCategory, object: &str) -> String {
        let id = Uuid::new_v4().to_string();
        db.insert_subscription(
            &id,
            user,
            category.as_str(),
            object,
            false,
            None,
            None,
            None,
            None,
            None,
        )
        .unwrap();
        id
    }

    fn post_data() -> PostNotificationData {
        PostNotificationData {
            created_at: Utc::now(),
            root_id: Uuid::new_v4(),
            root_title: "A thread".into(),
            root_type: "discussion".into(),
            comment_id: None,
            comment_text: None,
            parent_comment_id: None,
            chain_id: Some("edgeware".into()),
            community_id: None,
            author_address: "0xauthor".into(),
            author_chain: "edgeware".into(),
        }
    }

    #[tokio::test]
    async fn actor_does_not_notify_themselves() {
        let (notifier, db) = notifier();
        let author = seed_user_with_address(&db, "author", "0xauthor");
        let watcher = seed_user_with_address(&db, "watcher", "0xwatcher");
        subscribe(&db, &author, NotificationCategory::NewComment, "thread-1");
        subscribe(&db, &watcher, NotificationCategory::NewComment, "thread-1");

        let emitted = notifier
            .emit_post_notifications(
                NotificationCategory::NewComment,
                "thread-1",
                &post_data(),
                &["0xauthor".to_string()],
                &[],
            )
            .await
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(db.unread_notification_count(&author).unwrap(), 0);
        assert_eq!(db.unread_notification_count(&watcher).unwrap(), 1);
    }

    #[tokio::test]
    async fn include_list_restricts_recipients() {
        let (notifier, db) = notifier();
        let mentioned = seed_user_with_address(&db, "mentioned", "0xmentioned");
        let bystander = seed_user_with_address(&db, "bystander", "0xbystander");
        subscribe(&db, &mentioned, NotificationCategory::NewMention, "user-mentioned");
        subscribe(&db, &bystander, NotificationCategory::NewMention, "user-mentioned");

        let emitted = notifier
            .emit_post_notifications(
                NotificationCategory::NewMention,
                "user-mentioned",
                &post_data(),
                &[],
                &["0xmentioned".to_string()],
            )
            .await
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(db.unread_notification_count(&mentioned).unwrap(), 1);
        assert_eq!(db.unread_notification_count(&bystander).unwrap(), 0);
    }

    #[tokio::test]
    async fn inactive_subscriptions_are_skipped() {
        let (notifier, db) = notifier();
        let watcher = seed_user_with_address(&db, "watcher", "0xwatcher");
        let sub = subscribe(&db, &watcher, NotificationCategory::NewComment, "thread-1");
        db.toggle_subscription(&sub, &watcher).unwrap();

        let emitted = notifier
            .emit_post_notifications(
                NotificationCategory::NewComment,
                "thread-1",
                &post_data(),
                &[],
                &[],
            )
            .await
            .unwrap();

        assert_eq!(emitted, 0);
    }

    #[tokio::test]
    async fn duplicate_subscriptions_yield_one_notification() {
        let (notifier, db) = notifier();
        let watcher = seed_user_with_address(&db, "watcher", "0xwatcher");
        subscribe(&db, &watcher, NotificationCategory::NewComment, "thread-1");
        subscribe(&db, &watcher, NotificationCategory::NewComment, "thread-1");

        let emitted = notifier
            .emit_post_notifications(
                NotificationCategory::NewComment,
                "thread-1",
                &post_data(),
                &[],
                &[],
            )
            .await
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(db.unread_notification_count(&watcher).unwrap(), 1);
    }

    #[tokio::test]
    async fn connected_subscriber_receives_gateway_push() {
        let (notifier, db) = notifier();
        let watcher = seed_user_with_address(&db, "watcher", "0xwatcher");
        subscribe(&db, &watcher, NotificationCategory::NewComment, "thread-1");

        let watcher_uuid: Uuid = watcher.parse().unwrap();
        let (_conn, mut rx) = notifier
            .dispatcher()
            .register_user_channel(watcher_uuid)
            .await;

        notifier
            .emit_post_notifications(
                NotificationCategory::NewComment,
                "thread-1",
                &post_data(),
                &[],
                &[],
            )
            .await
            .unwrap();

        match rx.try_recv() {
            Ok(GatewayEvent::Notification { category, .. }) => {
                assert_eq!(category, NotificationCategory::NewComment);
            }
            other => panic!("expected Notification push, got {:?}", other),
        }
    }
}
