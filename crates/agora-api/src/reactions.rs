use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::error;
use uuid::Uuid;

use agora_db::models::ReactionRow;
use agora_types::api::{Claims, ReactionGroup, ToggleReactionRequest};
use agora_types::notifications::{NotificationCategory, PostNotificationData};

use crate::addresses::owned_address;
use crate::auth::AppState;
use crate::error::ApiError;

fn group_reactions(rows: Vec<ReactionRow>) -> Vec<ReactionGroup> {
    let mut groups: Vec<ReactionGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let i = *index.entry(row.reaction.clone()).or_insert_with(|| {
            groups.push(ReactionGroup {
                reaction: row.reaction.clone(),
                count: 0,
                address_ids: Vec::new(),
            });
            groups.len() - 1
        });
        groups[i].count += 1;
        if let Ok(id) = row.address_id.parse() {
            groups[i].address_ids.push(id);
        }
    }
    groups
}

pub async fn toggle_thread_reaction(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = state
        .db
        .get_thread(&thread_id.to_string())?
        .ok_or(ApiError::ThreadNotFound)?;
    let reactor = owned_address(&state, &claims, &req.address_id)?;

    let (added, _) = state.db.toggle_reaction(
        &Uuid::new_v4().to_string(),
        &reactor.id,
        Some(&thread.id),
        None,
        &req.reaction,
    )?;

    if added {
        let data = PostNotificationData {
            created_at: Utc::now(),
            root_id: thread_id,
            root_title: thread.title.clone(),
            root_type: thread.kind.clone(),
            comment_id: None,
            comment_text: None,
            parent_comment_id: None,
            chain_id: thread.chain_id.clone(),
            community_id: thread.community_id.clone(),
            author_address: reactor.address.clone(),
            author_chain: reactor.chain.clone(),
        };
        if let Err(e) = state
            .notifier
            .emit_post_notifications(
                NotificationCategory::NewReaction,
                &thread.id,
                &data,
                &[reactor.address.clone()],
                &[],
            )
            .await
        {
            error!("Failed to generate reaction notifications: {}", e);
        }
    }

    Ok(Json(serde_json::json!({ "added": added })))
}

pub async fn toggle_comment_reaction(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or(ApiError::CommentNotFound)?;
    let thread = state
        .db
        .get_thread(&comment.thread_id)?
        .ok_or(ApiError::ThreadNotFound)?;
    let reactor = owned_address(&state, &claims, &req.address_id)?;

    let (added, _) = state.db.toggle_reaction(
        &Uuid::new_v4().to_string(),
        &reactor.id,
        None,
        Some(&comment.id),
        &req.reaction,
    )?;

    if added {
        let data = PostNotificationData {
            created_at: Utc::now(),
            root_id: thread.id.parse().unwrap_or_default(),
            root_title: thread.title.clone(),
            root_type: thread.kind.clone(),
            comment_id: Some(comment_id),
            comment_text: Some(comment.text.clone()),
            parent_comment_id: None,
            chain_id: thread.chain_id.clone(),
            community_id: thread.community_id.clone(),
            author_address: reactor.address.clone(),
            author_chain: reactor.chain.clone(),
        };
        // Reaction subscriptions on a comment use the comment id as object
        if let Err(e) = state
            .notifier
            .emit_post_notifications(
                NotificationCategory::NewReaction,
                &comment.id,
                &data,
                &[reactor.address.clone()],
                &[],
            )
            .await
        {
            error!("Failed to generate reaction notifications: {}", e);
        }
    }

    Ok(Json(serde_json::json!({ "added": added })))
}

pub async fn list_thread_reactions(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.get_thread(&thread_id.to_string())?.is_none() {
        return Err(ApiError::ThreadNotFound);
    }
    let rows = state.db.get_reactions_for_thread(&thread_id.to_string())?;
    Ok(Json(group_reactions(rows)))
}

pub async fn list_comment_reactions(
    State(state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.get_comment(&comment_id.to_string())?.is_none() {
        return Err(ApiError::CommentNotFound);
    }
    let rows = state
        .db
        .get_reactions_for_comments(&[comment_id.to_string()])?;
    Ok(Json(group_reactions(rows)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(address: &str, reaction: &str) -> ReactionRow {
        ReactionRow {
            id: Uuid::new_v4().to_string(),
            address_id: address.into(),
            thread_id: Some("t1".into()),
            comment_id: None,
            reaction: reaction.into(),
            created_at: "2024-01-01 00:00:00".into(),
        }
    }

    #[test]
    fn reactions_group_by_kind() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        let groups = group_reactions(vec![row(&a, "like"), row(&b, "like"), row(&a, "dislike")]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].reaction, "like");
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[1].reaction, "dislike");
        assert_eq!(groups[1].count, 1);
    }
}
