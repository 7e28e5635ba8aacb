use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};

use him_types::api::Claims;
use him_types::models::User;

use crate::auth::AppState;
use crate::error::ApiError;

/// The verified caller, injected into request extensions by `require_auth`.
/// Handlers behind the gateway trust this and never re-authenticate.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub fn decode_claims(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token expired".into()),
        _ => ApiError::Unauthorized("Invalid token".into()),
    })
}

/// Full token check: valid signature, live server-side session, and an
/// existing user. Bumps `last_seen_at` as a side effect of any
/// authenticated request.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token =
        bearer_token(headers).ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;
    let claims = decode_claims(&state.jwt_secret, token)?;

    let db = state.clone();
    let user = tokio::task::spawn_blocking(move || -> Result<User, ApiError> {
        if !db.db.session_live(&claims.jti.to_string(), Utc::now())? {
            return Err(ApiError::Unauthorized("Session revoked or expired".into()));
        }

        let row = db
            .db
            .get_user_by_id(&claims.sub.to_string())?
            .ok_or_else(|| ApiError::Unauthorized("Invalid token".into()))?;

        db.db.touch_last_seen(&row.id, Utc::now())?;
        Ok(row.into_user())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    Ok(user)
}

/// Gateway middleware for all protected routes. On failure the request never
/// reaches its handler.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Layered inside `require_auth` on admin routes. A valid token without the
/// admin flag is a 403, distinct from the 401 of a failed authentication.
pub async fn require_admin(req: Request, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;
    if !user.0.is_admin {
        return Err(ApiError::Forbidden("Admin privileges required".into()));
    }
    Ok(next.run(req).await)
}
