use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::HeaderMap};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use rand::Rng;
use uuid::Uuid;

use him_db::Database;
use him_db::StoreError;
use him_db::users::NewUser;
use him_types::api::{AuthAction, AuthRequest, AuthResponse, Claims, OkResponse, VerifyResponse};

use crate::error::ApiError;
use crate::middleware::{authenticate, bearer_token, decode_claims};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub session_ttl: chrono::Duration,
    pub daily_bonus: i64,
    pub premium_price: i64,
    pub min_password_len: usize,
    pub bonus_cooldown_secs: u64,
}

/// `POST /auth` — the client dispatches login/register through one endpoint.
pub async fn auth(
    State(state): State<AppState>,
    Json(req): Json<AuthRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    match req.action {
        AuthAction::Register => register(state, req).await,
        AuthAction::Login => login(state, req).await,
    }
}

async fn register(state: AppState, req: AuthRequest) -> Result<Json<AuthResponse>, ApiError> {
    let username = req.username.trim().to_string();
    let email = req.email.as_deref().unwrap_or("").trim().to_string();

    if username.len() < 3 {
        return Err(ApiError::Validation(
            "Username must be at least 3 characters".into(),
        ));
    }
    if req.password.len() < state.min_password_len {
        return Err(ApiError::Validation(format!(
            "Password must be at least {} characters",
            state.min_password_len
        )));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("A valid email is required".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    // The custom id is random, so retry on the rare collision.
    let mut row = None;
    for _ in 0..32 {
        let custom_id = generate_custom_id();
        match state.db.create_user(
            NewUser {
                id: &user_id.to_string(),
                username: &username,
                custom_id: &custom_id,
                email: &email,
                password_hash: &password_hash,
            },
            Utc::now(),
        ) {
            Ok(created) => {
                row = Some(created);
                break;
            }
            Err(StoreError::CustomIdTaken) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    let user = row
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("custom id space exhausted")))?
        .into_user();

    let token = issue_token(&state, user.id)?;
    Ok(Json(AuthResponse {
        token,
        user,
        message: "Registration successful".into(),
    }))
}

async fn login(state: AppState, req: AuthRequest) -> Result<Json<AuthResponse>, ApiError> {
    // Same error for unknown user and bad password.
    let invalid = || ApiError::Unauthorized("Invalid username or password".into());

    let row = state
        .db
        .get_user_by_username(req.username.trim())?
        .ok_or_else(invalid)?;

    let parsed_hash = PasswordHash::new(&row.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt password hash: {}", e)))?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| invalid())?;

    let user = row.into_user();
    let token = issue_token(&state, user.id)?;
    Ok(Json(AuthResponse {
        token,
        user,
        message: "Login successful".into(),
    }))
}

/// `GET /auth` — token check; returns the fresh user record.
pub async fn verify(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<VerifyResponse>, ApiError> {
    let user = authenticate(&state, &headers).await?;
    Ok(Json(VerifyResponse { user, valid: true }))
}

/// `POST /auth/logout` — idempotent. An invalid or already-revoked token
/// still yields Ok.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Json<OkResponse> {
    if let Some(token) = bearer_token(&headers) {
        if let Ok(claims) = decode_claims(&state.jwt_secret, token) {
            let db = state.clone();
            let _ = tokio::task::spawn_blocking(move || {
                db.db.delete_session(&claims.jti.to_string())
            })
            .await;
        }
    }
    Json(OkResponse { ok: true })
}

pub fn hash_password(plain: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("argon2: {}", e)))?
        .to_string();
    Ok(hash)
}

/// Display handles follow the legacy `USER` + 6 digits scheme.
pub fn generate_custom_id() -> String {
    format!("USER{:06}", rand::rng().random_range(0..1_000_000))
}

fn issue_token(state: &AppState, user_id: Uuid) -> Result<String, ApiError> {
    let session_id = Uuid::new_v4();
    let now = Utc::now();
    let expires_at = now + state.session_ttl;

    let claims = Claims {
        sub: user_id,
        jti: session_id,
        exp: expires_at.timestamp() as usize,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("jwt encode: {}", e)))?;

    state
        .db
        .create_session(&session_id.to_string(), &user_id.to_string(), now, Some(expires_at))?;

    Ok(token)
}
