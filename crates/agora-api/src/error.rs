use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// Typed API errors. Each variant maps to an HTTP status and a JSON body
/// of the form `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error("Username already taken")]
    UsernameTaken,
    #[error("Invalid username or password format")]
    InvalidRegistration,

    #[error("Address not found")]
    AddressNotFound,
    #[error("Address already exists")]
    AddressExists,
    #[error("User does not own the addresses")]
    AddressesNotOwned,
    #[error("Verification token does not match")]
    InvalidVerificationToken,
    #[error("Verification token expired")]
    VerificationExpired,

    #[error("Chain not found")]
    ChainNotFound,
    #[error("Community not found")]
    CommunityNotFound,
    #[error("Community id already taken")]
    CommunityExists,
    #[error("Thread not found")]
    ThreadNotFound,
    #[error("Comment not found")]
    CommentNotFound,
    #[error("Thread is read-only")]
    ThreadReadOnly,
    #[error("Not the author or a collaborator")]
    NotAuthor,

    #[error("Subscription not found")]
    SubscriptionNotFound,
    #[error("Invalid notification category")]
    InvalidCategory,

    #[error("Must be an admin")]
    NotAdmin,
    #[error("Community does not allow invites")]
    InvitesDisabled,
    #[error("Invite code already used or invalid")]
    InviteInvalid,

    #[error("Internal error")]
    Database(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotLoggedIn | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::NotAdmin | Self::AddressesNotOwned | Self::NotAuthor | Self::ThreadReadOnly => {
                StatusCode::FORBIDDEN
            }
            Self::UsernameTaken | Self::AddressExists | Self::CommunityExists => {
                StatusCode::CONFLICT
            }
            Self::AddressNotFound
            | Self::ChainNotFound
            | Self::CommunityNotFound
            | Self::ThreadNotFound
            | Self::CommentNotFound
            | Self::SubscriptionNotFound => StatusCode::NOT_FOUND,
            Self::InvalidRegistration
            | Self::InvalidVerificationToken
            | Self::VerificationExpired
            | Self::InvalidCategory
            | Self::InvitesDisabled
            | Self::InviteInvalid => StatusCode::BAD_REQUEST,
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Database(e) = &self {
            error!("Internal error: {:#}", e);
        }
        let status = self.status();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
