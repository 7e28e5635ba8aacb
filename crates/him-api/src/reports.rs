use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use him_types::api::{FileReportRequest, OkResponse, ReportResponse, ReportsResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

/// `POST /reports` — any authenticated user can file against another user.
pub async fn file_report(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Json(req): Json<FileReportRequest>,
) -> Result<Json<ReportResponse>, ApiError> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(ApiError::Validation("Reason is required".into()));
    }

    let db = state.clone();
    let reporter = user.id.to_string();
    let target = req.target_id.to_string();
    let row = tokio::task::spawn_blocking(move || {
        db.db
            .file_report(&Uuid::new_v4().to_string(), &reporter, &target, &reason, Utc::now())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    info!(reporter = %user.id, target = %req.target_id, "report filed");
    Ok(Json(ReportResponse {
        report: row.into_report(),
    }))
}

/// `GET /admin/reports` — pending queue, oldest first. Admin-only; the
/// router enforces that before this handler runs.
pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<ReportsResponse>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_pending_reports())
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    Ok(Json(ReportsResponse {
        reports: rows.into_iter().map(|r| r.into_report()).collect(),
    }))
}

/// `POST /admin/reports/{report_id}/resolve` — one-way transition.
pub async fn resolve(
    State(state): State<AppState>,
    Extension(CurrentUser(admin)): Extension<CurrentUser>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<OkResponse>, ApiError> {
    let db = state.clone();
    let admin_id = admin.id.to_string();
    tokio::task::spawn_blocking(move || {
        db.db.resolve_report(&report_id.to_string(), &admin_id, Utc::now())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow::anyhow!("join error: {}", e)))??;

    info!(report_id = %report_id, admin = %admin.id, "report resolved");
    Ok(Json(OkResponse { ok: true }))
}
