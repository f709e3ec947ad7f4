use axum::{Extension, Json, extract::Path, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use agora_db::models::CommunityRow;
use agora_db::queries::CommunityLinks;
use agora_types::api::{Claims, CreateCommunityRequest, SetWebhookRequest, StarCommunityRequest};
use agora_types::models::Community;

use crate::addresses::owned_address;
use crate::auth::AppState;
use crate::error::ApiError;
use crate::subscriptions::parse_sqlite_datetime;

pub(crate) fn to_community(row: CommunityRow) -> Community {
    Community {
        id: row.id,
        name: row.name,
        creator_address_id: row.creator_address_id.parse().unwrap_or_default(),
        default_chain: row.default_chain,
        description: row.description,
        website: row.website,
        discord: row.discord,
        element: row.element,
        telegram: row.telegram,
        github: row.github,
        privacy_enabled: row.privacy_enabled,
        invites_enabled: row.invites_enabled,
        created_at: parse_sqlite_datetime(&row.created_at),
    }
}

pub async fn create_community(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCommunityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Community ids are URL slugs
    if req.id.is_empty()
        || !req.id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ApiError::InvalidRegistration);
    }

    if state.db.get_chain(&req.default_chain)?.is_none() {
        return Err(ApiError::ChainNotFound);
    }
    if state.db.get_community(&req.id)?.is_some() {
        return Err(ApiError::CommunityExists);
    }

    let creator = owned_address(&state, &claims, &req.creator_address_id)?;

    state.db.create_community(
        &req.id,
        &req.name,
        &creator.id,
        &req.default_chain,
        req.description.as_deref(),
        CommunityLinks {
            website: req.website.as_deref(),
            discord: req.discord.as_deref(),
            element: req.element.as_deref(),
            telegram: req.telegram.as_deref(),
            github: req.github.as_deref(),
        },
        req.privacy_enabled,
        req.invites_enabled,
    )?;

    let row = state
        .db
        .get_community(&req.id)?
        .ok_or_else(|| anyhow::anyhow!("Community {} vanished after insert", req.id))?;

    Ok((StatusCode::CREATED, Json(to_community(row))))
}

pub async fn list_communities(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = state.db.list_communities()?;
    let communities: Vec<Community> = rows.into_iter().map(to_community).collect();
    Ok(Json(communities))
}

pub async fn get_community(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_community(&id)?
        .ok_or(ApiError::CommunityNotFound)?;
    Ok(Json(to_community(row)))
}

pub async fn delete_community(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_community(&id)?
        .ok_or(ApiError::CommunityNotFound)?;

    if !claims.is_admin {
        // Creators can delete their own community
        let creator_id: Uuid = row
            .creator_address_id
            .parse()
            .map_err(|e| anyhow::anyhow!("Corrupt address id '{}': {}", row.creator_address_id, e))?;
        owned_address(&state, &claims, &creator_id).map_err(|_| ApiError::NotAdmin)?;
    }

    state.db.soft_delete_community(&row.id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Toggle a star on a community or a chain. Exactly one of the two ids must
/// be set; the response reports the new state.
pub async fn star_community(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StarCommunityRequest>,
) -> Result<impl IntoResponse, ApiError> {
    match (&req.community_id, &req.chain_id) {
        (Some(_), Some(_)) | (None, None) => return Err(ApiError::CommunityNotFound),
        (Some(community_id), None) => {
            if state.db.get_community(community_id)?.is_none() {
                return Err(ApiError::CommunityNotFound);
            }
        }
        (None, Some(chain_id)) => {
            if state.db.get_chain(chain_id)?.is_none() {
                return Err(ApiError::ChainNotFound);
            }
        }
    }

    let starred = state.db.toggle_star(
        &Uuid::new_v4().to_string(),
        &claims.sub.to_string(),
        req.community_id.as_deref(),
        req.chain_id.as_deref(),
    )?;

    Ok(Json(serde_json::json!({ "starred": starred })))
}

/// Set or clear the webhook URL that notifications for this community are
/// mirrored to. Restricted to the community creator and admins.
pub async fn set_webhook(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SetWebhookRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db
        .get_community(&id)?
        .ok_or(ApiError::CommunityNotFound)?;

    if !claims.is_admin {
        let creator_id: Uuid = row
            .creator_address_id
            .parse()
            .map_err(|e| anyhow::anyhow!("Corrupt address id '{}': {}", row.creator_address_id, e))?;
        owned_address(&state, &claims, &creator_id).map_err(|_| ApiError::NotAdmin)?;
    }

    state.db.set_community_webhook(&row.id, req.webhook_url.as_deref())?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing;

    fn seed_user_with_address(state: &AppState, username: &str, address: &str) -> (String, String) {
        let user_id = Uuid::new_v4().to_string();
        state.db.create_user(&user_id, username, "hash", None).unwrap();
        let address_id = Uuid::new_v4().to_string();
        state
            .db
            .create_address(
                &address_id,
                address,
                "edgeware",
                Some(&user_id),
                "token",
                "2099-01-01 00:00:00",
            )
            .unwrap();
        (user_id, address_id)
    }

    #[tokio::test]
    async fn webhook_set_by_creator_only() {
        let state = testing::state();
        let (creator, creator_address) = seed_user_with_address(&state, "creator", "0xaaa");
        let (stranger, _) = seed_user_with_address(&state, "stranger", "0xbbb");
        state
            .db
            .create_community(
                "gov",
                "Governance",
                &creator_address,
                "edgeware",
                None,
                CommunityLinks::default(),
                false,
                false,
            )
            .unwrap();

        let result = set_webhook(
            State(state.clone()),
            Path("gov".into()),
            Extension(testing::claims_for(&stranger, "stranger")),
            Json(SetWebhookRequest {
                webhook_url: Some("https://hooks.example.com/gov".into()),
            }),
        )
        .await;
        assert!(matches!(result, Err(ApiError::NotAdmin)));
        assert!(state.db.community_webhook_url("gov").unwrap().is_none());

        set_webhook(
            State(state.clone()),
            Path("gov".into()),
            Extension(testing::claims_for(&creator, "creator")),
            Json(SetWebhookRequest {
                webhook_url: Some("https://hooks.example.com/gov".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(
            state.db.community_webhook_url("gov").unwrap().as_deref(),
            Some("https://hooks.example.com/gov")
        );

        // clearing
        set_webhook(
            State(state.clone()),
            Path("gov".into()),
            Extension(testing::claims_for(&creator, "creator")),
            Json(SetWebhookRequest { webhook_url: None }),
        )
        .await
        .unwrap();
        assert!(state.db.community_webhook_url("gov").unwrap().is_none());
    }
}
