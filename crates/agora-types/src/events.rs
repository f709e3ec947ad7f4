use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notifications::{ChainEventLabel, NotificationCategory};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms successful identification
    Ready { user_id: Uuid, username: String },

    /// A notification row was created for this user
    Notification {
        notification_id: Uuid,
        subscription_id: Uuid,
        category: NotificationCategory,
        data: serde_json::Value,
        /// Pre-rendered label for chain-event notifications
        label: Option<ChainEventLabel>,
        created_at: chrono::DateTime<chrono::Utc>,
    },

    /// Unread counter changed (markRead / clearRead from another session)
    UnreadCount { unread: usize },

    /// A user came online or went offline
    PresenceUpdate {
        user_id: Uuid,
        username: String,
        online: bool,
    },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Authenticate the WebSocket connection
    Identify { token: String },

    /// Client-side heartbeat response
    Pong,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_event_wire_shape() {
        let event = GatewayEvent::UnreadCount { unread: 3 };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "UnreadCount");
        assert_eq!(json["data"]["unread"], 3);
    }

    #[test]
    fn identify_roundtrip() {
        let cmd: GatewayCommand =
            serde_json::from_str(r#"{"type":"Identify","data":{"token":"abc"}}"#).unwrap();
        match cmd {
            GatewayCommand::Identify { token } => assert_eq!(token, "abc"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn category_wire_names_are_stable() {
        for (cat, s) in [
            (NotificationCategory::NewThread, "new-thread-creation"),
            (NotificationCategory::NewComment, "new-comment-creation"),
            (NotificationCategory::NewMention, "new-mention"),
            (NotificationCategory::NewReaction, "new-reaction"),
            (NotificationCategory::NewCollaboration, "new-collaboration"),
            (NotificationCategory::ChainEvent, "chain-event"),
        ] {
            assert_eq!(cat.as_str(), s);
            assert_eq!(NotificationCategory::parse(s), Some(cat));
            assert_eq!(serde_json::to_value(cat).unwrap(), s);
        }
        assert_eq!(NotificationCategory::parse("bogus"), None);
    }
}
