use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use him_db::StoreError;

/// Everything a handler can fail with, mapped onto the transport. Statuses:
/// 401 authentication, 403 authorization, 400 validation, 409 conflict,
/// 404 not found, 402 insufficient funds, 429 bonus cooldown, 500 generic.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("not enough HimCoins")]
    InsufficientFunds,
    #[error("daily bonus already claimed")]
    BonusCooldown,
    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken => ApiError::Conflict("Username already exists".into()),
            StoreError::EmailTaken => ApiError::Conflict("Email already exists".into()),
            StoreError::CustomIdTaken => ApiError::Conflict("Custom ID already taken".into()),
            StoreError::NotPremium => {
                ApiError::Forbidden("Premium required to change custom ID".into())
            }
            StoreError::UserNotFound => ApiError::NotFound("User not found".into()),
            StoreError::ChatNotFound => ApiError::NotFound("Chat not found".into()),
            StoreError::NotParticipant => {
                ApiError::Forbidden("Not a participant of this chat".into())
            }
            StoreError::SelfChat => {
                ApiError::Validation("Cannot open a chat with yourself".into())
            }
            StoreError::SelfReport => ApiError::Validation("Cannot report yourself".into()),
            StoreError::ReportNotFound => ApiError::NotFound("Report not found".into()),
            StoreError::AlreadyResolved => ApiError::Conflict("Report already resolved".into()),
            StoreError::InsufficientFunds => ApiError::InsufficientFunds,
            StoreError::BonusCooldown => ApiError::BonusCooldown,
            err @ (StoreError::LockPoisoned | StoreError::Db(_)) => {
                ApiError::Internal(anyhow::anyhow!(err))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::InsufficientFunds => {
                (StatusCode::PAYMENT_REQUIRED, "Not enough HimCoins".to_string())
            }
            ApiError::BonusCooldown => (
                StatusCode::TOO_MANY_REQUESTS,
                "Daily bonus already claimed".to_string(),
            ),
            ApiError::Internal(err) => {
                // Storage details stay in the logs, never in the body.
                error!("internal error: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
