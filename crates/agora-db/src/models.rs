/// Database row types — these map directly to SQLite rows.
/// Distinct from agora-types API models to keep the DB layer independent;
/// ids and timestamps stay as TEXT here and are parsed at the API edge.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub email_interval: String,
    pub is_admin: bool,
    pub created_at: String,
}

pub struct ChainRow {
    pub id: String,
    pub name: String,
    pub network: String,
    pub base: String,
    pub symbol: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub discord: Option<String>,
    pub telegram: Option<String>,
    pub github: Option<String>,
    pub icon_url: Option<String>,
    pub active: bool,
}

pub struct ChainEventTypeRow {
    pub id: String,
    pub chain: String,
    pub event_name: String,
}

pub struct ChainEventRow {
    pub id: String,
    pub chain_event_type_id: String,
    pub block_number: u64,
    pub event_data: String,
    pub created_at: String,
}

pub struct AddressRow {
    pub id: String,
    pub address: String,
    pub chain: String,
    pub user_id: Option<String>,
    pub verification_token: String,
    pub verification_token_expires: String,
    pub verified_at: Option<String>,
    pub last_active: Option<String>,
}

pub struct CommunityRow {
    pub id: String,
    pub name: String,
    pub creator_address_id: String,
    pub default_chain: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub discord: Option<String>,
    pub element: Option<String>,
    pub telegram: Option<String>,
    pub github: Option<String>,
    pub privacy_enabled: bool,
    pub invites_enabled: bool,
    pub created_at: String,
    pub deleted_at: Option<String>,
}

pub struct ThreadRow {
    pub id: String,
    pub author_address_id: String,
    // Joined from addresses for display
    pub author_address: String,
    pub author_chain: String,
    pub community_id: Option<String>,
    pub chain_id: Option<String>,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub stage: String,
    pub url: Option<String>,
    pub read_only: bool,
    pub pinned: bool,
    pub version_history: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub thread_id: String,
    pub author_address_id: String,
    pub author_address: String,
    pub author_chain: String,
    pub parent_id: Option<String>,
    pub text: String,
    pub created_at: String,
}

pub struct ReactionRow {
    pub id: String,
    pub address_id: String,
    pub thread_id: Option<String>,
    pub comment_id: Option<String>,
    pub reaction: String,
    pub created_at: String,
}

pub struct SubscriptionRow {
    pub id: String,
    pub subscriber_id: String,
    pub category: String,
    pub object_id: String,
    pub is_active: bool,
    pub immediate_email: bool,
    pub chain_id: Option<String>,
    pub community_id: Option<String>,
    pub thread_id: Option<String>,
    pub comment_id: Option<String>,
    pub chain_event_type_id: Option<String>,
    pub created_at: String,
}

pub struct NotificationRow {
    pub id: String,
    pub subscription_id: String,
    pub category: String,
    pub data: String,
    pub chain_event_id: Option<String>,
    pub thread_id: Option<String>,
    pub is_read: bool,
    pub created_at: String,
}

pub struct InviteCodeRow {
    pub code: String,
    pub community_id: String,
    pub creator_id: String,
    pub invited_email: Option<String>,
    pub used: bool,
    pub created_at: String,
}
