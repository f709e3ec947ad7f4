use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use agora_notify::digest::{NotificationBatchRows, batch_rows};
use agora_notify::labeler;
use agora_types::api::{Claims, MarkReadRequest, NotificationBatch};
use agora_types::events::GatewayEvent;
use agora_types::notifications::{ChainEventNotificationData, NotificationCategory};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::subscriptions::parse_sqlite_datetime;

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

const MAX_LIMIT: u32 = 200;

/// List the caller's notifications as display batches, unread first.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<NotificationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let limit = query.limit.min(MAX_LIMIT);

    let rows = tokio::task::spawn_blocking(move || db.list_notifications_for_user(&user_id, limit))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    let batches = batch_rows(rows);

    // Network family per chain, for labeling chain-event rows
    let mut networks: HashMap<String, String> = HashMap::new();
    let mut out = Vec::with_capacity(batches.len());
    for batch in batches {
        out.push(to_batch_response(&state, &mut networks, batch)?);
    }
    Ok(Json(out))
}

fn to_batch_response(
    state: &AppState,
    networks: &mut HashMap<String, String>,
    batch: NotificationBatchRows,
) -> Result<NotificationBatch, ApiError> {
    let category =
        NotificationCategory::parse(&batch.head.category).ok_or(ApiError::InvalidCategory)?;
    let data: serde_json::Value = serde_json::from_str(&batch.head.data)
        .map_err(|e| anyhow::anyhow!("Corrupt notification data: {}", e))?;

    let (label, block_number) = if category == NotificationCategory::ChainEvent {
        let event: ChainEventNotificationData = serde_json::from_value(data.clone())
            .map_err(|e| anyhow::anyhow!("Corrupt chain-event data: {}", e))?;
        let network = match networks.get(&event.chain_id) {
            Some(n) => n.clone(),
            None => {
                let n = state
                    .db
                    .get_chain(&event.chain_id)?
                    .map(|c| c.network)
                    .unwrap_or_default();
                networks.insert(event.chain_id.clone(), n.clone());
                n
            }
        };
        let label = labeler::label_event(&network, &event.chain_id, &event.event_data);
        (Some(label), Some(event.block_number))
    } else {
        (None, None)
    };

    let authors = batch.authors();
    let notification_ids = batch
        .ids()
        .iter()
        .filter_map(|id| id.parse().ok())
        .collect();

    Ok(NotificationBatch {
        head_id: batch.head.id.parse().unwrap_or_default(),
        subscription_id: batch.head.subscription_id.parse().unwrap_or_default(),
        category,
        count: batch.len(),
        is_read: batch.head.is_read,
        created_at: parse_sqlite_datetime(&batch.head.created_at),
        data,
        authors,
        label,
        block_number,
        notification_ids,
    })
}

/// Mark the given notifications read. Other sessions of the same user get
/// the new unread count pushed over the gateway.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ids: Vec<String> = req.notification_ids.iter().map(Uuid::to_string).collect();

    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let (marked, unread) = tokio::task::spawn_blocking(move || {
        let marked = db.mark_notifications_read(&user_id, &ids)?;
        let unread = db.unread_notification_count(&user_id)?;
        Ok::<_, anyhow::Error>((marked, unread))
    })
    .await
    .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    state
        .dispatcher
        .send_to_user(claims.sub, GatewayEvent::UnreadCount { unread })
        .await;

    Ok(Json(serde_json::json!({ "marked": marked, "unread": unread })))
}

/// Delete all read notifications for the caller.
pub async fn clear_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let db = state.db.clone();
    let user_id = claims.sub.to_string();
    let cleared = tokio::task::spawn_blocking(move || db.clear_read_notifications(&user_id))
        .await
        .map_err(|e| anyhow::anyhow!("spawn_blocking join error: {}", e))??;

    Ok(Json(serde_json::json!({ "cleared": cleared })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let unread = state
        .db
        .unread_notification_count(&claims.sub.to_string())?;
    Ok(Json(serde_json::json!({ "unread": unread })))
}
