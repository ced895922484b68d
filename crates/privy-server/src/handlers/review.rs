//! Manual review queue handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState, SuccessResponse};
use privy_core::models::{ManualReviewEntry, ReviewStatus};

/// Query parameters for listing the queue
#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    pub status: Option<String>,
}

/// Body for resolving a queued app
#[derive(Debug, Default, Deserialize)]
pub struct ResolveRequest {
    pub note: Option<String>,
}

/// GET /api/manual-review?status= - List the queue
pub async fn list_manual_review(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReviewQuery>,
) -> Result<Json<Vec<ManualReviewEntry>>, AppError> {
    let status = match params.status.as_deref() {
        None | Some("") | Some("all") => None,
        Some(s) => Some(
            s.parse::<ReviewStatus>()
                .map_err(|e| AppError::bad_request(&e))?,
        ),
    };

    let entries = state.db.list_manual_review(status)?;
    Ok(Json(entries))
}

/// POST /api/manual-review/:app_id/resolve - Mark a queued app as reviewed
pub async fn resolve_manual_review(
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<String>,
    body: Option<Json<ResolveRequest>>,
) -> Result<Json<SuccessResponse>, AppError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let note = request
        .note
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    if !state.db.resolve_manual_review(&app_id, note)? {
        return Err(AppError::not_found("App is not in the manual review queue"));
    }

    info!(app_id = %app_id, "Manual review resolved");
    Ok(Json(SuccessResponse { success: true }))
}
