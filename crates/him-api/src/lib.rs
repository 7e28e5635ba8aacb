pub mod auth;
pub mod chats;
pub mod error;
pub mod middleware;
pub mod reports;
pub mod users;
pub mod wallet;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};

use crate::auth::AppState;

/// The access gateway: one router, three rings. Public routes authenticate
/// themselves (or not at all); everything else goes through `require_auth`,
/// and the admin ring additionally through `require_admin`.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth", post(auth::auth).get(auth::verify))
        .route("/auth/logout", post(auth::logout));

    let protected = Router::new()
        .route("/users/me", get(users::me))
        .route("/users/me/custom_id", put(users::update_custom_id))
        .route("/wallet/bonus", post(wallet::claim_bonus))
        .route("/wallet/premium", post(wallet::purchase_premium))
        .route("/chats", get(chats::list_chats))
        .route("/messages", get(chats::get_messages).post(chats::post_messages))
        .route("/reports", post(reports::file_report))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let admin = Router::new()
        .route("/admin/reports", get(reports::list_pending))
        .route("/admin/reports/{report_id}/resolve", post(reports::resolve))
        .layer(from_fn(middleware::require_admin))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public)
        .merge(protected)
        .merge(admin)
        .with_state(state)
}
