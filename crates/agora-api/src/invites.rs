use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::info;

use agora_types::api::{
    Claims, CreateInviteRequest, CreateInviteResponse, RedeemInviteRequest, WaitlistRequest,
};

use crate::auth::AppState;
use crate::error::ApiError;

const INVITE_CODE_LEN: usize = 24;

fn new_invite_code() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(INVITE_CODE_LEN)
        .map(char::from)
        .collect()
}

/// Mint a single-use invite code for a community. Only allowed when the
/// community has invites enabled, or the caller is an admin.
pub async fn create_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let community = state
        .db
        .get_community(&req.community_id)?
        .ok_or(ApiError::CommunityNotFound)?;

    if !community.invites_enabled && !claims.is_admin {
        return Err(ApiError::InvitesDisabled);
    }

    let code = new_invite_code();
    state.db.create_invite_code(
        &code,
        &community.id,
        &claims.sub.to_string(),
        req.invited_email.as_deref(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(CreateInviteResponse {
            code,
            community_id: community.id,
        }),
    ))
}

/// Consume an invite code. A code redeems exactly once; concurrent redeems
/// race on an atomic update and only one wins.
pub async fn redeem_invite(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<RedeemInviteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let invite = state
        .db
        .get_invite_code(&req.code)?
        .ok_or(ApiError::InviteInvalid)?;

    if state.db.get_community(&invite.community_id)?.is_none() {
        return Err(ApiError::InviteInvalid);
    }

    if !state.db.use_invite_code(&req.code)? {
        return Err(ApiError::InviteInvalid);
    }

    info!("Invite to {} redeemed by {}", invite.community_id, claims.username);

    Ok(Json(serde_json::json!({ "community_id": invite.community_id })))
}

/// Register interest in a chain that has no community yet. Idempotent per
/// (chain, email).
pub async fn join_waitlist(
    State(state): State<AppState>,
    Json(req): Json<WaitlistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if !req.email.contains('@') {
        return Err(ApiError::InvalidRegistration);
    }
    if state.db.get_chain(&req.chain)?.is_none() {
        return Err(ApiError::ChainNotFound);
    }

    let added = state.db.add_waitlist_registration(
        &uuid::Uuid::new_v4().to_string(),
        None,
        &req.email,
        &req.chain,
    )?;
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(serde_json::json!({ "registered": true }))))
}
