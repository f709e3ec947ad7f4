use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use rand::distr::Alphanumeric;
use tracing::info;
use uuid::Uuid;

use agora_db::models::AddressRow;
use agora_types::api::{
    Claims, LinkAddressRequest, LinkAddressResponse, MergeAccountsRequest, MergeAccountsResponse,
    VerifyAddressRequest, VerifyAddressResponse,
};

use crate::auth::{self, AppState};
use crate::error::ApiError;

const TOKEN_LEN: usize = 32;
const TOKEN_VALID_HOURS: i64 = 24;
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S";

/// Look up an address and check the caller owns it. Shared by every
/// handler that takes an author address.
pub(crate) fn owned_address(
    state: &AppState,
    claims: &Claims,
    address_id: &Uuid,
) -> Result<AddressRow, ApiError> {
    let row = state
        .db
        .get_address_by_id(&address_id.to_string())?
        .ok_or(ApiError::AddressNotFound)?;
    if row.user_id.as_deref() != Some(claims.sub.to_string().as_str()) {
        return Err(ApiError::AddressesNotOwned);
    }
    Ok(row)
}

fn new_verification_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Create (or refresh) an address row with a fresh verification token. The
/// address is attached to the caller but unverified until the token is
/// echoed back through `/api/verifyAddress`.
pub async fn link_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LinkAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if state.db.get_chain(&req.chain)?.is_none() {
        return Err(ApiError::ChainNotFound);
    }

    let token = new_verification_token();
    let expires_at = Utc::now() + Duration::hours(TOKEN_VALID_HOURS);
    let expires_str = expires_at.format(SQLITE_DATETIME).to_string();

    if let Some(existing) = state.db.get_address(&req.chain, &req.address)? {
        if existing.verified_at.is_some() {
            return Err(ApiError::AddressExists);
        }
        // Unverified address: re-issue the token
        state
            .db
            .reset_verification_token(&existing.id, &token, &expires_str)?;
        let address_id: Uuid = existing
            .id
            .parse()
            .map_err(|e| anyhow::anyhow!("Corrupt address id '{}': {}", existing.id, e))?;
        return Ok((
            StatusCode::OK,
            Json(LinkAddressResponse {
                address_id,
                verification_token: token,
                expires_at,
            }),
        ));
    }

    let address_id = Uuid::new_v4();
    state.db.create_address(
        &address_id.to_string(),
        &req.address,
        &req.chain,
        Some(&claims.sub.to_string()),
        &token,
        &expires_str,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(LinkAddressResponse {
            address_id,
            verification_token: token,
            expires_at,
        }),
    ))
}

/// Prove ownership of a linked address by echoing its verification token.
pub async fn verify_address(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<VerifyAddressRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_address(&req.chain, &req.address)?
        .ok_or(ApiError::AddressNotFound)?;

    if row.verification_token != req.verification_token {
        return Err(ApiError::InvalidVerificationToken);
    }

    let expires = NaiveDateTime::parse_from_str(&row.verification_token_expires, SQLITE_DATETIME)
        .map_err(|e| anyhow::anyhow!("Corrupt token expiry '{}': {}", row.verification_token_expires, e))?
        .and_utc();
    if Utc::now() > expires {
        return Err(ApiError::VerificationExpired);
    }

    let verified_at = Utc::now();
    state.db.verify_address(
        &row.id,
        &claims.sub.to_string(),
        &verified_at.format(SQLITE_DATETIME).to_string(),
    )?;

    info!("Address {} on {} verified for {}", req.address, req.chain, claims.username);

    let address_id: Uuid = row
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt address id '{}': {}", row.id, e))?;

    Ok(Json(VerifyAddressResponse {
        address_id,
        verified_at,
    }))
}

/// Fold an old account into the calling user's account: every listed
/// address (and the old account's subscriptions) moves over. The caller
/// must prove control of the old account with its password; listing an
/// address the old account does not own rejects the whole request.
pub async fn merge_accounts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MergeAccountsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let from_user = req.from_user_id.to_string();

    let source_account = state
        .db
        .get_user_by_id(&from_user)?
        .ok_or(ApiError::AddressesNotOwned)?;
    if !auth::verify_password(&source_account.password, &req.from_password)? {
        return Err(ApiError::AddressesNotOwned);
    }

    for address_id in &req.address_ids {
        let row = state
            .db
            .get_address_by_id(&address_id.to_string())?
            .ok_or(ApiError::AddressNotFound)?;
        if row.user_id.as_deref() != Some(from_user.as_str()) {
            return Err(ApiError::AddressesNotOwned);
        }
    }

    let ids: Vec<String> = req.address_ids.iter().map(|id| id.to_string()).collect();
    let to_user = claims.sub.to_string();
    let moved = state.db.reassign_addresses(&ids, &from_user, &to_user)?;
    let moved_subs = state.db.reassign_subscriptions(&from_user, &to_user)?;

    info!(
        "Merged {} addresses and {} subscriptions from {} into {}",
        moved, moved_subs, from_user, claims.username
    );

    Ok(Json(MergeAccountsResponse {
        moved_addresses: moved,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing;

    fn seed_user(state: &AppState, username: &str, password: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let hash = auth::hash_password(password).unwrap();
        state.db.create_user(&id, username, &hash, None).unwrap();
        id
    }

    fn seed_address(state: &AppState, user_id: &str, address: &str) -> Uuid {
        let id = Uuid::new_v4();
        state
            .db
            .create_address(
                &id.to_string(),
                address,
                "edgeware",
                Some(user_id),
                "token",
                "2099-01-01 00:00:00",
            )
            .unwrap();
        id
    }

    #[tokio::test]
    async fn merge_rejected_without_source_account_password() {
        let state = testing::state();
        let victim = seed_user(&state, "victim", "victim-password");
        let caller = seed_user(&state, "caller", "caller-password");
        let address_id = seed_address(&state, &victim, "0xaaa");

        let result = merge_accounts(
            State(state.clone()),
            Extension(testing::claims_for(&caller, "caller")),
            Json(MergeAccountsRequest {
                address_ids: vec![address_id],
                from_user_id: victim.parse().unwrap(),
                from_password: "not-the-password".into(),
            }),
        )
        .await;

        assert!(matches!(result, Err(ApiError::AddressesNotOwned)));
        // nothing moved
        let row = state.db.get_address_by_id(&address_id.to_string()).unwrap().unwrap();
        assert_eq!(row.user_id.as_deref(), Some(victim.as_str()));
    }

    #[tokio::test]
    async fn merge_moves_addresses_with_source_account_password() {
        let state = testing::state();
        let old_account = seed_user(&state, "old-account", "old-password");
        let caller = seed_user(&state, "caller", "caller-password");
        let address_id = seed_address(&state, &old_account, "0xaaa");

        let result = merge_accounts(
            State(state.clone()),
            Extension(testing::claims_for(&caller, "caller")),
            Json(MergeAccountsRequest {
                address_ids: vec![address_id],
                from_user_id: old_account.parse().unwrap(),
                from_password: "old-password".into(),
            }),
        )
        .await;

        assert!(result.is_ok());
        let row = state.db.get_address_by_id(&address_id.to_string()).unwrap().unwrap();
        assert_eq!(row.user_id.as_deref(), Some(caller.as_str()));
    }
}
