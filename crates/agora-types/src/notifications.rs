use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription/notification categories. Stored as strings in the DB, so the
/// wire form is fixed and must never change for an existing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategory {
    #[serde(rename = "new-thread-creation")]
    NewThread,
    #[serde(rename = "new-comment-creation")]
    NewComment,
    #[serde(rename = "new-mention")]
    NewMention,
    #[serde(rename = "new-reaction")]
    NewReaction,
    #[serde(rename = "new-collaboration")]
    NewCollaboration,
    #[serde(rename = "chain-event")]
    ChainEvent,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewThread => "new-thread-creation",
            Self::NewComment => "new-comment-creation",
            Self::NewMention => "new-mention",
            Self::NewReaction => "new-reaction",
            Self::NewCollaboration => "new-collaboration",
            Self::ChainEvent => "chain-event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new-thread-creation" => Some(Self::NewThread),
            "new-comment-creation" => Some(Self::NewComment),
            "new-mention" => Some(Self::NewMention),
            "new-reaction" => Some(Self::NewReaction),
            "new-collaboration" => Some(Self::NewCollaboration),
            "chain-event" => Some(Self::ChainEvent),
            _ => None,
        }
    }
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload stored on notifications for the forum (non-chain) categories.
/// Serialized as JSON into the notification row and replayed verbatim to
/// clients and webhooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostNotificationData {
    pub created_at: DateTime<Utc>,
    /// Thread the notification hangs off of.
    pub root_id: Uuid,
    pub root_title: String,
    pub root_type: String,
    pub comment_id: Option<Uuid>,
    pub comment_text: Option<String>,
    pub parent_comment_id: Option<Uuid>,
    pub chain_id: Option<String>,
    pub community_id: Option<String>,
    pub author_address: String,
    pub author_chain: String,
}

/// Payload stored on chain-event notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainEventNotificationData {
    pub chain_event_id: Uuid,
    pub chain_event_type_id: String,
    pub chain_id: String,
    pub block_number: u64,
    pub event_data: serde_json::Value,
}

/// Rendered display form of a chain event, produced by the labeler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainEventLabel {
    pub heading: String,
    pub label: String,
    /// Client-side path to the relevant proposal page, when one exists.
    pub link_path: Option<String>,
}
