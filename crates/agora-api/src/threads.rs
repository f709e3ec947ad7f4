use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::error;
use uuid::Uuid;

use agora_db::models::ThreadRow;
use agora_types::api::{
    AddCollaboratorRequest, Claims, CreateThreadRequest, EditThreadRequest, ThreadResponse,
};
use agora_types::models::Thread;
use agora_types::notifications::{NotificationCategory, PostNotificationData};

use crate::addresses::owned_address;
use crate::auth::AppState;
use crate::error::ApiError;
use crate::subscriptions::{ensure_subscription, parse_sqlite_datetime};

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor pagination: pass the `created_at` timestamp of the oldest
    /// thread from the previous page to fetch older threads.
    pub before: Option<String>,
}

fn default_limit() -> u32 {
    20
}

const MAX_PAGE: u32 = 100;

/// Mention syntax is `[@username](...)`, the same markup the original
/// rich-text editor produced.
pub(crate) fn parse_mentions(text: &str) -> Vec<String> {
    let mut mentions = Vec::new();
    let bytes = text.as_bytes();
    let mut i = 0;
    while let Some(start) = text[i..].find("[@") {
        let start = i + start;
        let Some(end) = text[start..].find(']') else {
            break;
        };
        let end = start + end;
        // must be followed by a (link)
        if bytes.get(end + 1) == Some(&b'(') {
            let name = &text[start + 2..end];
            if !name.is_empty() && !mentions.iter().any(|m| m == name) {
                mentions.push(name.to_string());
            }
        }
        i = end + 1;
    }
    mentions
}

/// Emit `new-mention` notifications for every `[@username]` in the text.
/// Failures are logged and swallowed; a post never fails because a mention
/// could not be notified.
pub(crate) async fn notify_mentions(
    state: &AppState,
    text: &str,
    data: &PostNotificationData,
    author_addresses: &[String],
) {
    for username in parse_mentions(text) {
        let result = async {
            let Some(user) = state.db.get_user_by_username(&username)? else {
                return Ok::<_, anyhow::Error>(());
            };
            let object_id = format!("user-{}", user.id);
            ensure_subscription(
                &state.db,
                &user.id,
                NotificationCategory::NewMention,
                &object_id,
                None,
                None,
                None,
                None,
            )?;
            let include: Vec<String> = state
                .db
                .get_addresses_for_user(&user.id)?
                .into_iter()
                .map(|a| a.address)
                .collect();
            state
                .notifier
                .emit_post_notifications(
                    NotificationCategory::NewMention,
                    &object_id,
                    data,
                    author_addresses,
                    &include,
                )
                .await?;
            Ok(())
        }
        .await;

        if let Err(e) = result {
            error!("Failed to notify mention of {}: {}", username, e);
        }
    }
}

pub(crate) fn post_data_for_thread(row: &ThreadRow) -> PostNotificationData {
    PostNotificationData {
        created_at: Utc::now(),
        root_id: row.id.parse().unwrap_or_default(),
        root_title: row.title.clone(),
        root_type: row.kind.clone(),
        comment_id: None,
        comment_text: None,
        parent_comment_id: None,
        chain_id: row.chain_id.clone(),
        community_id: row.community_id.clone(),
        author_address: row.author_address.clone(),
        author_chain: row.author_chain.clone(),
    }
}

fn to_thread(row: &ThreadRow) -> Thread {
    Thread {
        id: row.id.parse().unwrap_or_default(),
        author_address_id: row.author_address_id.parse().unwrap_or_default(),
        community_id: row.community_id.clone(),
        chain_id: row.chain_id.clone(),
        title: row.title.clone(),
        body: row.body.clone(),
        kind: row.kind.clone(),
        stage: row.stage.clone(),
        url: row.url.clone(),
        read_only: row.read_only,
        pinned: row.pinned,
        created_at: parse_sqlite_datetime(&row.created_at),
        updated_at: parse_sqlite_datetime(&row.updated_at),
    }
}

pub async fn create_thread(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let community = state
        .db
        .get_community(&community_id)?
        .ok_or(ApiError::CommunityNotFound)?;
    let author = owned_address(&state, &claims, &req.author_address_id)?;
    state.db.touch_address(&author.id)?;

    let thread_id = Uuid::new_v4();
    state.db.insert_thread(
        &thread_id.to_string(),
        &author.id,
        Some(&community.id),
        None,
        &req.title,
        &req.body,
        &req.kind,
        &req.stage,
        req.url.as_deref(),
        req.read_only,
    )?;

    let user_id = claims.sub.to_string();
    // Auto-subscribe the author to comments and reactions on their thread
    ensure_subscription(
        &state.db,
        &user_id,
        NotificationCategory::NewComment,
        &thread_id.to_string(),
        Some(&community.id),
        None,
        Some(&thread_id.to_string()),
        None,
    )?;
    ensure_subscription(
        &state.db,
        &user_id,
        NotificationCategory::NewReaction,
        &thread_id.to_string(),
        Some(&community.id),
        None,
        Some(&thread_id.to_string()),
        None,
    )?;

    let row = state
        .db
        .get_thread(&thread_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Thread {} vanished after insert", thread_id))?;

    let author_addresses = vec![author.address.clone()];
    let data = post_data_for_thread(&row);

    // New-thread notifications go to subscribers of the community
    if let Err(e) = state
        .notifier
        .emit_post_notifications(
            NotificationCategory::NewThread,
            &community.id,
            &data,
            &author_addresses,
            &[],
        )
        .await
    {
        error!("Failed to generate thread notifications: {}", e);
    }

    notify_mentions(&state, &req.body, &data, &author_addresses).await;

    Ok((StatusCode::CREATED, Json(thread_response(&state, row)?)))
}

pub async fn list_threads(
    State(state): State<AppState>,
    Path(community_id): Path<String>,
    Query(query): Query<ThreadQuery>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.get_community(&community_id)?.is_none() {
        return Err(ApiError::CommunityNotFound);
    }

    let db = state.db.clone();
    let limit = query.limit.min(MAX_PAGE);
    let before = query.before.clone();
    let cid = community_id.clone();

    // Run blocking DB queries off the async runtime
    let (rows, counts) = tokio::task::spawn_blocking(move || {
        let rows = db.list_threads(&cid, limit, before.as_deref())?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let counts = db.comment_counts_for_threads(&ids)?;
        Ok::<_, anyhow::Error>((rows, counts))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let count_map: HashMap<String, usize> = counts.into_iter().collect();
    let threads: Vec<ThreadResponse> = rows
        .into_iter()
        .map(|row| {
            let comment_count = count_map.get(&row.id).copied().unwrap_or(0);
            ThreadResponse {
                author_address: row.author_address.clone(),
                author_chain: row.author_chain.clone(),
                collaborator_address_ids: Vec::new(),
                comment_count,
                thread: to_thread(&row),
            }
        })
        .collect();

    Ok(Json(threads))
}

pub async fn get_thread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_thread(&id.to_string())?
        .ok_or(ApiError::ThreadNotFound)?;
    Ok(Json(thread_response(&state, row)?))
}

pub async fn edit_thread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<EditThreadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_thread(&id.to_string())?
        .ok_or(ApiError::ThreadNotFound)?;

    require_author_or_collaborator(&state, &claims, &row)?;

    state.db.update_thread(
        &row.id,
        req.title.as_deref(),
        req.body.as_deref(),
        req.stage.as_deref(),
    )?;

    let updated = state
        .db
        .get_thread(&row.id)?
        .ok_or(ApiError::ThreadNotFound)?;
    Ok(Json(thread_response(&state, updated)?))
}

pub async fn delete_thread(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_thread(&id.to_string())?
        .ok_or(ApiError::ThreadNotFound)?;

    if !claims.is_admin {
        let author = state
            .db
            .get_address_by_id(&row.author_address_id)?
            .ok_or(ApiError::AddressNotFound)?;
        if author.user_id.as_deref() != Some(claims.sub.to_string().as_str()) {
            return Err(ApiError::NotAuthor);
        }
    }

    state.db.soft_delete_thread(&row.id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_collaborator(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddCollaboratorRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_thread(&id.to_string())?
        .ok_or(ApiError::ThreadNotFound)?;

    // Only the author invites collaborators
    let author_address_id: Uuid = row
        .author_address_id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt address id '{}': {}", row.author_address_id, e))?;
    let author =
        owned_address(&state, &claims, &author_address_id).map_err(|_| ApiError::NotAuthor)?;

    let collaborator = state
        .db
        .get_address_by_id(&req.address_id.to_string())?
        .ok_or(ApiError::AddressNotFound)?;

    let added = state.db.add_collaborator(&row.id, &collaborator.id)?;

    if added {
        if let Some(target_user) = collaborator.user_id.clone() {
            let object_id = format!("user-{}", target_user);
            let result = async {
                ensure_subscription(
                    &state.db,
                    &target_user,
                    NotificationCategory::NewCollaboration,
                    &object_id,
                    None,
                    None,
                    Some(&row.id),
                    None,
                )?;
                let data = post_data_for_thread(&row);
                state
                    .notifier
                    .emit_post_notifications(
                        NotificationCategory::NewCollaboration,
                        &object_id,
                        &data,
                        &[author.address.clone()],
                        &[collaborator.address.clone()],
                    )
                    .await?;
                Ok::<_, anyhow::Error>(())
            }
            .await;
            if let Err(e) = result {
                error!("Failed to generate collaboration notification: {}", e);
            }
        }
    }

    Ok(Json(serde_json::json!({ "added": added })))
}

fn require_author_or_collaborator(
    state: &AppState,
    claims: &Claims,
    row: &ThreadRow,
) -> Result<(), ApiError> {
    let user_id = claims.sub.to_string();

    let author = state
        .db
        .get_address_by_id(&row.author_address_id)?
        .ok_or(ApiError::AddressNotFound)?;
    if author.user_id.as_deref() == Some(user_id.as_str()) {
        return Ok(());
    }

    // Any collaborator address owned by the caller grants edit rights
    for address in state.db.get_addresses_for_user(&user_id)? {
        if state.db.is_collaborator(&row.id, &address.id)? {
            return Ok(());
        }
    }

    Err(ApiError::NotAuthor)
}

fn thread_response(state: &AppState, row: ThreadRow) -> Result<ThreadResponse, ApiError> {
    let collaborators = state.db.get_collaborators(&row.id)?;
    let comment_count = state
        .db
        .comment_counts_for_threads(&[row.id.clone()])?
        .into_iter()
        .map(|(_, count)| count)
        .next()
        .unwrap_or(0);

    Ok(ThreadResponse {
        author_address: row.author_address.clone(),
        author_chain: row.author_chain.clone(),
        collaborator_address_ids: collaborators
            .iter()
            .filter_map(|a| a.id.parse().ok())
            .collect(),
        comment_count,
        thread: to_thread(&row),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing;

    #[tokio::test]
    async fn collaborator_invite_rejects_corrupt_author_address_id() {
        let state = testing::state();
        // Address ids are TEXT at the DB edge; a non-UUID row must surface
        // as an internal error, not resolve to the nil UUID.
        state
            .db
            .create_address(
                "legacy-addr",
                "0xaaa",
                "edgeware",
                None,
                "token",
                "2099-01-01 00:00:00",
            )
            .unwrap();
        let thread_id = Uuid::new_v4();
        state
            .db
            .insert_thread(
                &thread_id.to_string(),
                "legacy-addr",
                None,
                Some("edgeware"),
                "title",
                "body",
                "discussion",
                "discussion",
                None,
                false,
            )
            .unwrap();

        let caller = Uuid::new_v4().to_string();
        let result = add_collaborator(
            State(state.clone()),
            Path(thread_id),
            Extension(testing::claims_for(&caller, "caller")),
            Json(AddCollaboratorRequest {
                address_id: Uuid::new_v4(),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::Database(_))));
    }

    #[test]
    fn mention_parsing() {
        assert_eq!(
            parse_mentions("hey [@alice](/profile/1) and [@bob](/profile/2)"),
            vec!["alice".to_string(), "bob".to_string()]
        );
        // duplicate mentions collapse
        assert_eq!(
            parse_mentions("[@alice](/p/1) again [@alice](/p/1)"),
            vec!["alice".to_string()]
        );
        // bare brackets without a link are not mentions
        assert!(parse_mentions("array[@index] = 3").is_empty());
        assert!(parse_mentions("no mentions here").is_empty());
    }
}
