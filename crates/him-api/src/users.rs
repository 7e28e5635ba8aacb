use axum::{Extension, Json, extract::State};

use him_types::api::{UpdateCustomIdRequest, UserResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    // `require_auth` already loaded a fresh record.
    Json(UserResponse { user })
}

/// `PUT /users/me/custom_id` — premium capability, not an admin action.
pub async fn update_custom_id(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<UpdateCustomIdRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let new_id = req.custom_id.trim().to_string();
    if new_id.is_empty() {
        return Err(ApiError::Validation("Custom ID is required".into()));
    }
    if new_id.len() > 32 {
        return Err(ApiError::Validation(
            "Custom ID must be at most 32 characters".into(),
        ));
    }

    let db = state.clone();
    let user_id = user.id.to_string();
    let updated = tokio::task::spawn_blocking(move || {
        db.db.update_custom_id(&user_id, &new_id)?;
        db.db.get_user_by_id(&user_id)
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??
    .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(UserResponse {
        user: updated.into_user(),
    }))
}
