use axum::{Extension, Json, extract::State};
use chrono::Utc;
use tracing::info;

use him_types::api::WalletResponse;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// `POST /wallet/bonus` — credit the daily reward. With the cooldown
/// configured to zero (the default) every claim succeeds.
pub async fn claim_bonus(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<WalletResponse>, ApiError> {
    let db = state.clone();
    let user_id = user.id.to_string();
    let balance = tokio::task::spawn_blocking(move || {
        db.db
            .claim_bonus(&user_id, db.daily_bonus, db.bonus_cooldown_secs, Utc::now())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    info!(user_id = %user.id, balance, "daily bonus claimed");
    Ok(Json(WalletResponse {
        him_coins: balance,
        is_premium: user.is_premium,
    }))
}

/// `POST /wallet/premium` — debit the price and flag the account in one
/// store transaction.
pub async fn purchase_premium(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<Json<WalletResponse>, ApiError> {
    let db = state.clone();
    let user_id = user.id.to_string();
    let balance =
        tokio::task::spawn_blocking(move || db.db.purchase_premium(&user_id, db.premium_price))
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    info!(user_id = %user.id, balance, "premium purchased");
    Ok(Json(WalletResponse {
        him_coins: balance,
        is_premium: true,
    }))
}
