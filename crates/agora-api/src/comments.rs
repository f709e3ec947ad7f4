use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::error;
use uuid::Uuid;

use agora_db::models::CommentRow;
use agora_types::api::{Claims, CreateCommentRequest};
use agora_types::models::Comment;
use agora_types::notifications::{NotificationCategory, PostNotificationData};

use crate::addresses::owned_address;
use crate::auth::AppState;
use crate::error::ApiError;
use crate::subscriptions::{ensure_subscription, parse_sqlite_datetime};
use crate::threads::notify_mentions;

fn to_comment(row: &CommentRow) -> Comment {
    Comment {
        id: row.id.parse().unwrap_or_default(),
        thread_id: row.thread_id.parse().unwrap_or_default(),
        author_address_id: row.author_address_id.parse().unwrap_or_default(),
        parent_id: row.parent_id.as_ref().and_then(|p| p.parse().ok()),
        text: row.text.clone(),
        created_at: parse_sqlite_datetime(&row.created_at),
    }
}

pub async fn create_comment(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let thread = state
        .db
        .get_thread(&thread_id.to_string())?
        .ok_or(ApiError::ThreadNotFound)?;
    if thread.read_only {
        return Err(ApiError::ThreadReadOnly);
    }

    let author = owned_address(&state, &claims, &req.author_address_id)?;
    state.db.touch_address(&author.id)?;

    if let Some(parent_id) = &req.parent_id {
        let parent = state
            .db
            .get_comment(&parent_id.to_string())?
            .ok_or(ApiError::CommentNotFound)?;
        if parent.thread_id != thread.id {
            return Err(ApiError::CommentNotFound);
        }
    }

    let comment_id = Uuid::new_v4();
    state.db.insert_comment(
        &comment_id.to_string(),
        &thread.id,
        &author.id,
        req.parent_id.map(|p| p.to_string()).as_deref(),
        &req.text,
    )?;

    let user_id = claims.sub.to_string();
    // Commenters follow the thread and reactions on their own comment
    ensure_subscription(
        &state.db,
        &user_id,
        NotificationCategory::NewComment,
        &thread.id,
        thread.community_id.as_deref(),
        thread.chain_id.as_deref(),
        Some(&thread.id),
        None,
    )?;
    ensure_subscription(
        &state.db,
        &user_id,
        NotificationCategory::NewReaction,
        &comment_id.to_string(),
        thread.community_id.as_deref(),
        thread.chain_id.as_deref(),
        Some(&thread.id),
        Some(&comment_id.to_string()),
    )?;

    let row = state
        .db
        .get_comment(&comment_id.to_string())?
        .ok_or_else(|| anyhow::anyhow!("Comment {} vanished after insert", comment_id))?;

    let data = PostNotificationData {
        created_at: Utc::now(),
        root_id: thread_id,
        root_title: thread.title.clone(),
        root_type: thread.kind.clone(),
        comment_id: Some(comment_id),
        comment_text: Some(req.text.clone()),
        parent_comment_id: req.parent_id,
        chain_id: thread.chain_id.clone(),
        community_id: thread.community_id.clone(),
        author_address: author.address.clone(),
        author_chain: author.chain.clone(),
    };
    let author_addresses = vec![author.address.clone()];

    if let Err(e) = state
        .notifier
        .emit_post_notifications(
            NotificationCategory::NewComment,
            &thread.id,
            &data,
            &author_addresses,
            &[],
        )
        .await
    {
        error!("Failed to generate comment notifications: {}", e);
    }

    notify_mentions(&state, &req.text, &data, &author_addresses).await;

    Ok((StatusCode::CREATED, Json(to_comment(&row))))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(thread_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.get_thread(&thread_id.to_string())?.is_none() {
        return Err(ApiError::ThreadNotFound);
    }

    let db = state.db.clone();
    let tid = thread_id.to_string();
    let rows = tokio::task::spawn_blocking(move || db.list_comments(&tid))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let comments: Vec<Comment> = rows.iter().map(to_comment).collect();
    Ok(Json(comments))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_comment(&id.to_string())?
        .ok_or(ApiError::CommentNotFound)?;

    if !claims.is_admin {
        let author = state
            .db
            .get_address_by_id(&row.author_address_id)?
            .ok_or(ApiError::AddressNotFound)?;
        if author.user_id.as_deref() != Some(claims.sub.to_string().as_str()) {
            return Err(ApiError::NotAuthor);
        }
    }

    state.db.soft_delete_comment(&row.id)?;
    Ok(StatusCode::NO_CONTENT)
}
