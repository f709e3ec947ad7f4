use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use agora_db::Database;
use agora_db::models::SubscriptionRow;
use agora_types::api::{Claims, CreateSubscriptionRequest, SubscriptionResponse};
use agora_types::notifications::NotificationCategory;

use crate::auth::AppState;
use crate::error::ApiError;

/// Find-or-create a subscription for a user on (category, object).
/// Used by handlers that auto-subscribe authors to their own content.
pub(crate) fn ensure_subscription(
    db: &Database,
    user_id: &str,
    category: NotificationCategory,
    object_id: &str,
    community_id: Option<&str>,
    chain_id: Option<&str>,
    thread_id: Option<&str>,
    comment_id: Option<&str>,
) -> anyhow::Result<SubscriptionRow> {
    if let Some(existing) = db.find_subscription(user_id, category.as_str(), object_id)? {
        return Ok(existing);
    }
    let id = Uuid::new_v4().to_string();
    db.insert_subscription(
        &id,
        user_id,
        category.as_str(),
        object_id,
        false,
        chain_id,
        community_id,
        thread_id,
        comment_id,
        None,
    )?;
    db.get_subscription(&id)?
        .ok_or_else(|| anyhow::anyhow!("Subscription {} vanished after insert", id))
}

fn to_response(row: SubscriptionRow) -> Result<SubscriptionResponse, ApiError> {
    let id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt subscription id '{}': {}", row.id, e))?;
    let category =
        NotificationCategory::parse(&row.category).ok_or(ApiError::InvalidCategory)?;
    let created_at = parse_sqlite_datetime(&row.created_at);
    Ok(SubscriptionResponse {
        id,
        category,
        object_id: row.object_id,
        is_active: row.is_active,
        immediate_email: row.immediate_email,
        created_at,
    })
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
/// Parse as naive UTC and convert; RFC 3339 strings also pass through.
pub(crate) fn parse_sqlite_datetime(s: &str) -> chrono::DateTime<chrono::Utc> {
    s.parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_default()
}

pub async fn create_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = claims.sub.to_string();

    if let Some(existing) =
        state
            .db
            .find_subscription(&user_id, req.category.as_str(), &req.object_id)?
    {
        return Ok((StatusCode::OK, Json(to_response(existing)?)));
    }

    let id = Uuid::new_v4().to_string();
    state.db.insert_subscription(
        &id,
        &user_id,
        req.category.as_str(),
        &req.object_id,
        req.immediate_email,
        req.chain_id.as_deref(),
        req.community_id.as_deref(),
        req.thread_id.map(|t| t.to_string()).as_deref(),
        req.comment_id.map(|c| c.to_string()).as_deref(),
        req.chain_event_type_id.as_deref(),
    )?;

    let row = state
        .db
        .get_subscription(&id)?
        .ok_or_else(|| anyhow::anyhow!("Subscription {} vanished after insert", id))?;
    Ok((StatusCode::CREATED, Json(to_response(row)?)))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state
        .db
        .list_subscriptions_for_user(&claims.sub.to_string())?;
    let subscriptions: Vec<SubscriptionResponse> = rows
        .into_iter()
        .map(to_response)
        .collect::<Result<_, _>>()?;
    Ok(Json(subscriptions))
}

pub async fn toggle_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let active = state
        .db
        .toggle_subscription(&id.to_string(), &claims.sub.to_string())?
        .ok_or(ApiError::SubscriptionNotFound)?;
    Ok(Json(serde_json::json!({ "is_active": active })))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .db
        .delete_subscription(&id.to_string(), &claims.sub.to_string())?;
    if !deleted {
        return Err(ApiError::SubscriptionNotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
