use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Chain, Community, Thread};
use crate::notifications::NotificationCategory;

// -- JWT Claims --

/// JWT claims shared between agora-api (REST middleware) and agora-gateway
/// (WebSocket identify). Canonical definition lives here in agora-types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub is_admin: bool,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Addresses --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkAddressRequest {
    pub address: String,
    pub chain: String,
}

#[derive(Debug, Serialize)]
pub struct LinkAddressResponse {
    pub address_id: Uuid,
    pub verification_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyAddressRequest {
    pub address: String,
    pub chain: String,
    pub verification_token: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyAddressResponse {
    pub address_id: Uuid,
    pub verified_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MergeAccountsRequest {
    /// Addresses (by id) to move onto the calling user's account.
    pub address_ids: Vec<Uuid>,
    /// The old account being folded in.
    pub from_user_id: Uuid,
    /// Password of the old account; merging requires proving control of
    /// both accounts.
    pub from_password: String,
}

#[derive(Debug, Serialize)]
pub struct MergeAccountsResponse {
    pub moved_addresses: usize,
}

// -- Communities --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommunityRequest {
    pub id: String,
    pub name: String,
    pub default_chain: String,
    pub creator_address_id: Uuid,
    pub description: Option<String>,
    pub website: Option<String>,
    pub discord: Option<String>,
    pub element: Option<String>,
    pub telegram: Option<String>,
    pub github: Option<String>,
    #[serde(default)]
    pub privacy_enabled: bool,
    #[serde(default)]
    pub invites_enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetWebhookRequest {
    /// `None` clears the webhook.
    pub webhook_url: Option<String>,
}

// -- Threads --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateThreadRequest {
    pub author_address_id: Uuid,
    pub title: String,
    pub body: String,
    #[serde(default = "default_thread_kind")]
    pub kind: String,
    #[serde(default = "default_thread_stage")]
    pub stage: String,
    pub url: Option<String>,
    #[serde(default)]
    pub read_only: bool,
}

fn default_thread_kind() -> String {
    "discussion".into()
}

fn default_thread_stage() -> String {
    "discussion".into()
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditThreadRequest {
    pub title: Option<String>,
    pub body: Option<String>,
    pub stage: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddCollaboratorRequest {
    pub address_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ThreadResponse {
    #[serde(flatten)]
    pub thread: Thread,
    pub author_address: String,
    pub author_chain: String,
    pub collaborator_address_ids: Vec<Uuid>,
    pub comment_count: usize,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub author_address_id: Uuid,
    pub text: String,
    pub parent_id: Option<Uuid>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub address_id: Uuid,
    pub reaction: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub reaction: String,
    pub count: usize,
    pub address_ids: Vec<Uuid>,
}

// -- Subscriptions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSubscriptionRequest {
    pub category: NotificationCategory,
    pub object_id: String,
    #[serde(default)]
    pub immediate_email: bool,
    pub chain_id: Option<String>,
    pub community_id: Option<String>,
    pub thread_id: Option<Uuid>,
    pub comment_id: Option<Uuid>,
    pub chain_event_type_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub id: Uuid,
    pub category: NotificationCategory,
    pub object_id: String,
    pub is_active: bool,
    pub immediate_email: bool,
    pub created_at: DateTime<Utc>,
}

// -- Notifications --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkReadRequest {
    pub notification_ids: Vec<Uuid>,
}

/// One display row: a batch of notifications on the same subscription and
/// thread root, newest first. `count` covers the whole batch.
#[derive(Debug, Serialize)]
pub struct NotificationBatch {
    pub head_id: Uuid,
    pub subscription_id: Uuid,
    pub category: NotificationCategory,
    pub count: usize,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub data: serde_json::Value,
    /// Distinct (author_chain, author_address) pairs across the batch.
    pub authors: Vec<(String, String)>,
    /// Rendered heading/label for chain-event batches.
    pub label: Option<crate::notifications::ChainEventLabel>,
    pub block_number: Option<u64>,
    pub notification_ids: Vec<Uuid>,
}

// -- Chain events --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestChainEventRequest {
    pub chain: String,
    pub kind: String,
    pub block_number: u64,
    pub data: serde_json::Value,
    #[serde(default)]
    pub exclude_addresses: Vec<String>,
    #[serde(default)]
    pub include_addresses: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct IngestChainEventResponse {
    pub chain_event_id: Uuid,
    /// False when the event was already ingested (idempotent replay).
    pub created: bool,
    pub notifications_emitted: usize,
}

// -- Invites / waitlist / stars --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInviteRequest {
    pub community_id: String,
    pub invited_email: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateInviteResponse {
    pub code: String,
    pub community_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemInviteRequest {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WaitlistRequest {
    pub chain: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StarCommunityRequest {
    pub community_id: Option<String>,
    pub chain_id: Option<String>,
}

// -- Bulk --

/// One-shot payload backing the community sidebar: every active community
/// and chain, recent threads with comment counts, and the caller's stars.
#[derive(Debug, Serialize)]
pub struct BulkOffchainResponse {
    pub communities: Vec<Community>,
    pub chains: Vec<Chain>,
    pub recent_threads: Vec<ThreadResponse>,
    pub starred_community_ids: Vec<String>,
    pub unread_notifications: usize,
}
