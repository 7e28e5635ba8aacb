mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use him_api::auth::{AppState, AppStateInner, generate_custom_id, hash_password};
use him_db::users::NewUser;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "him=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = him_db::Database::open(&PathBuf::from(&config.db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        session_ttl: chrono::Duration::days(config.session_ttl_days.max(1)),
        daily_bonus: config.daily_bonus,
        premium_price: config.premium_price,
        min_password_len: config.min_password_len,
        bonus_cooldown_secs: config.bonus_cooldown_secs,
    });

    seed_admin(&state, &config)?;

    let app = him_api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("HIM server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Provision the bootstrap admin identity, if configured. Public
/// registration can never produce an admin; this is the only path.
fn seed_admin(state: &AppState, config: &Config) -> anyhow::Result<()> {
    let (Some(username), Some(password)) = (&config.admin_username, &config.admin_password)
    else {
        return Ok(());
    };

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("admin password hash: {}", e))?;
    let created = state
        .db
        .seed_admin(
            NewUser {
                id: &Uuid::new_v4().to_string(),
                username,
                custom_id: &generate_custom_id(),
                email: &format!("{}@him.local", username),
                password_hash: &password_hash,
            },
            Utc::now(),
        )
        .map_err(|e| anyhow::anyhow!("admin seed: {}", e))?;

    if created {
        info!(%username, "admin account provisioned");
    }
    Ok(())
}
