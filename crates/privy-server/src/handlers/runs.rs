//! Ingestion run log handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::{AppError, AppState, MAX_PAGE_LIMIT};
use privy_core::models::IngestRun;

fn default_limit() -> i64 {
    50
}

/// Query parameters for the run log
#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(rename = "appId")]
    pub app_id: Option<String>,
}

/// GET /api/runs?limit=&appId= - Recent ingestion runs, newest first
pub async fn list_runs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RunsQuery>,
) -> Result<Json<Vec<IngestRun>>, AppError> {
    let limit = params.limit.clamp(1, MAX_PAGE_LIMIT);
    let runs = state.db.list_ingest_runs(params.app_id.as_deref(), limit)?;
    Ok(Json(runs))
}
