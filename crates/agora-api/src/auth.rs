use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use agora_db::Database;
use agora_gateway::dispatcher::Dispatcher;
use agora_notify::{ChainEventHandler, Notifier};
use agora_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub jwt_secret: String,
    pub notifier: Notifier,
    pub dispatcher: Dispatcher,
    pub chain_events: ChainEventHandler,
    /// Username granted admin rights at registration (bootstrap admin).
    pub admin_username: Option<String>,
}

pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string())
}

pub(crate) fn verify_password(hash: &str, password: &str) -> anyhow::Result<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| anyhow::anyhow!("Corrupt password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::InvalidRegistration);
    }
    if req.password.len() < 8 {
        return Err(ApiError::InvalidRegistration);
    }

    if state.db.get_user_by_username(&req.username)?.is_some() {
        return Err(ApiError::UsernameTaken);
    }

    // Hash password with Argon2id
    let password_hash = hash_password(&req.password)?;

    let user_id = Uuid::new_v4();

    state.db.create_user(
        &user_id.to_string(),
        &req.username,
        &password_hash,
        req.email.as_deref(),
    )?;

    // The configured bootstrap admin is promoted at registration
    let is_admin = state.admin_username.as_deref() == Some(req.username.as_str());
    if is_admin {
        state.db.set_user_admin(&user_id.to_string(), true)?;
    }

    let token = create_token(&state.jwt_secret, user_id, &req.username, is_admin)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { user_id, token }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_username(&req.username)?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    if !verify_password(&user.password, &req.password)? {
        return Err(ApiError::InvalidCredentials);
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("Corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username, user.is_admin)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

fn create_token(
    secret: &str,
    user_id: Uuid,
    username: &str,
    is_admin: bool,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        is_admin,
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    pub fn state_with_admin(admin_username: Option<&str>) -> AppState {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let dispatcher = Dispatcher::new();
        let notifier = Notifier::new(db.clone(), dispatcher.clone());
        Arc::new(AppStateInner {
            db,
            jwt_secret: "test-secret".into(),
            notifier: notifier.clone(),
            dispatcher,
            chain_events: ChainEventHandler::new(notifier, Vec::new()),
            admin_username: admin_username.map(String::from),
        })
    }

    pub fn state() -> AppState {
        state_with_admin(None)
    }

    pub fn claims_for(user_id: &str, username: &str) -> Claims {
        Claims {
            sub: user_id.parse().unwrap(),
            username: username.into(),
            is_admin: false,
            exp: usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bootstrap_admin_promoted_at_registration() {
        let state = testing::state_with_admin(Some("root"));

        register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "root".into(),
                password: "password123".into(),
                email: None,
            }),
        )
        .await
        .unwrap();
        register(
            State(state.clone()),
            Json(RegisterRequest {
                username: "alice".into(),
                password: "password123".into(),
                email: None,
            }),
        )
        .await
        .unwrap();

        assert!(state.db.get_user_by_username("root").unwrap().unwrap().is_admin);
        assert!(!state.db.get_user_by_username("alice").unwrap().unwrap().is_admin);
    }
}
