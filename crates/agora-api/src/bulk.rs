use std::collections::HashMap;

use axum::{Extension, Json, extract::State, response::IntoResponse};

use agora_types::api::{BulkOffchainResponse, Claims, ThreadResponse};
use agora_types::models::{Chain, Thread};

use crate::auth::AppState;
use crate::communities::to_community;
use crate::error::ApiError;
use crate::subscriptions::parse_sqlite_datetime;

const RECENT_THREADS: u32 = 20;

/// One-shot payload for initial page load: communities, chains, recent
/// threads, the caller's stars, and their unread count.
pub async fn bulk_offchain(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub.to_string();

    let (communities, chains, threads, counts, starred, unread) =
        tokio::task::spawn_blocking(move || {
            let communities = db.list_communities()?;
            let chains = db.list_chains()?;
            let threads = db.recent_threads(RECENT_THREADS)?;
            let ids: Vec<String> = threads.iter().map(|t| t.id.clone()).collect();
            let counts = db.comment_counts_for_threads(&ids)?;
            let starred = db.starred_community_ids(&user_id)?;
            let unread = db.unread_notification_count(&user_id)?;
            Ok::<_, anyhow::Error>((communities, chains, threads, counts, starred, unread))
        })
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let count_map: HashMap<String, usize> = counts.into_iter().collect();
    let recent_threads: Vec<ThreadResponse> = threads
        .into_iter()
        .map(|row| {
            let comment_count = count_map.get(&row.id).copied().unwrap_or(0);
            ThreadResponse {
                author_address: row.author_address.clone(),
                author_chain: row.author_chain.clone(),
                collaborator_address_ids: Vec::new(),
                comment_count,
                thread: Thread {
                    id: row.id.parse().unwrap_or_default(),
                    author_address_id: row.author_address_id.parse().unwrap_or_default(),
                    community_id: row.community_id,
                    chain_id: row.chain_id,
                    title: row.title,
                    body: row.body,
                    kind: row.kind,
                    stage: row.stage,
                    url: row.url,
                    read_only: row.read_only,
                    pinned: row.pinned,
                    created_at: parse_sqlite_datetime(&row.created_at),
                    updated_at: parse_sqlite_datetime(&row.updated_at),
                },
            }
        })
        .collect();

    Ok(Json(BulkOffchainResponse {
        communities: communities.into_iter().map(to_community).collect(),
        chains: chains
            .into_iter()
            .map(|c| Chain {
                id: c.id,
                name: c.name,
                network: c.network,
                base: c.base,
                symbol: c.symbol,
                description: c.description,
                website: c.website,
                discord: c.discord,
                telegram: c.telegram,
                github: c.github,
                icon_url: c.icon_url,
                active: c.active,
            })
            .collect(),
        recent_threads,
        starred_community_ids: starred,
        unread_notifications: unread,
    }))
}
