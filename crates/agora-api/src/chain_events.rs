use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use agora_types::api::{Claims, IngestChainEventRequest, IngestChainEventResponse};

use crate::auth::AppState;
use crate::error::ApiError;

/// Admin-only ingest endpoint for decoded chain events. The event listener
/// process posts here; replays of an already-seen event return 200 with
/// `created: false` and emit nothing.
pub async fn ingest_chain_event(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<IngestChainEventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !claims.is_admin {
        return Err(ApiError::NotAdmin);
    }

    let outcome = state
        .chain_events
        .handle(
            &req.chain,
            &req.kind,
            req.block_number,
            req.data,
            &req.exclude_addresses,
            &req.include_addresses,
        )
        .await
        .map_err(|e| {
            if state.db.get_chain(&req.chain).ok().flatten().is_none() {
                ApiError::ChainNotFound
            } else {
                ApiError::Database(e)
            }
        })?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(IngestChainEventResponse {
            chain_event_id: outcome.chain_event_id,
            created: outcome.created,
            notifications_emitted: outcome.notifications_emitted,
        }),
    ))
}
