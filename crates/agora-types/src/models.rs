use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A blockchain network configuration record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chain {
    pub id: String,
    pub name: String,
    /// Protocol family used by the event labeler: "substrate", "moloch",
    /// "compound", "aave".
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

/// An off-chain discussion community, independent of any chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Community {
    pub id: String,
    pub name: String,
    pub creator_address_id: Uuid,
    pub default_chain: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub discord: Option<String>,
    pub element: Option<String>,
    pub telegram: Option<String>,
    pub github: Option<String>,
    pub privacy_enabled: bool,
    pub invites_enabled: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: Uuid,
    pub author_address_id: Uuid,
    pub community_id: Option<String>,
    pub chain_id: Option<String>,
    pub title: String,
    pub body: String,
    pub kind: String,
    pub stage: String,
    pub url: Option<String>,
    pub read_only: bool,
    pub pinned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub author_address_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub text: String,
    pub created_at: DateTime<Utc>,
}
