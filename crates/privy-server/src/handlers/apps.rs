//! App catalog handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{AppError, AppState};
use privy_core::models::{AppSummary, PolicyWithIcon, SensitiveAppEntry};

/// GET /api/apps - Saved policies with icons, for the catalog screen
pub async fn list_apps(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AppSummary>>, AppError> {
    let apps = state.db.list_app_summaries()?;
    Ok(Json(apps))
}

/// GET /api/app/:app_id - Full policy row plus icon
pub async fn get_app(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<String>,
) -> Result<Json<PolicyWithIcon>, AppError> {
    let app = state
        .db
        .get_policy_with_icon(&app_id)?
        .ok_or_else(|| AppError::not_found("App not found"))?;
    Ok(Json(app))
}

/// GET /api/sensitive-apps - Apps diverted by category
pub async fn list_sensitive_apps(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SensitiveAppEntry>>, AppError> {
    let apps = state.db.list_sensitive_apps()?;
    Ok(Json(apps))
}
