//! Ingestion handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AppError, AppState};
use privy_core::{AppDetails, Error, IngestReport, MetadataProvider, PolicyText};

/// Health response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub ingestion_enabled: bool,
}

/// GET /api/health - Liveness
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        ingestion_enabled: state.pipeline.is_some(),
    })
}

/// Query parameters carrying an app identifier
#[derive(Debug, Deserialize)]
pub struct AppIdQuery {
    #[serde(rename = "appId")]
    pub app_id: Option<String>,
}

impl AppIdQuery {
    fn require(self) -> Result<String, AppError> {
        self.app_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::bad_request("App ID is required"))
    }
}

/// Query parameters for ad-hoc extraction
#[derive(Debug, Deserialize)]
pub struct UrlQuery {
    pub url: Option<String>,
}

/// GET /api/scrape?appId= - Run the ingestion pipeline for one app
pub async fn scrape(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AppIdQuery>,
) -> Result<Json<IngestReport>, AppError> {
    let app_id = params.require()?;
    let pipeline = state.pipeline()?;

    info!(app_id = %app_id, "Ingestion requested");
    Ok(Json(pipeline.trigger_ingestion(&app_id).await))
}

/// GET /api/scrapePolicy?url= - Extract policy text from a URL without saving it
pub async fn scrape_policy(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UrlQuery>,
) -> Result<Json<PolicyText>, AppError> {
    let url = params
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("A URL is required"))?;
    let pipeline = state.pipeline()?;

    match pipeline.extract_policy_text(&url).await {
        Ok(text) => Ok(Json(text)),
        Err(Error::NotFound(_)) => Err(AppError::not_found(
            "Privacy policy not found for this URL",
        )),
        Err(e) => Err(e.into()),
    }
}

/// GET /api/getAppDetails?appId= - Raw store metadata for an app
pub async fn get_app_details(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AppIdQuery>,
) -> Result<Json<AppDetails>, AppError> {
    let app_id = params.require()?;
    let pipeline = state.pipeline()?;

    match pipeline.metadata().fetch(&app_id).await {
        Ok(details) => Ok(Json(details)),
        Err(Error::NotFound(_)) => Err(AppError::not_found("App not found in store")),
        Err(e) => Err(e.into()),
    }
}
