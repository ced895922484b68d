//! Privy Web Server
//!
//! Axum-based REST API for the Privy privacy-policy ingestion service.
//!
//! Security features:
//! - Restrictive CORS policy
//! - Security headers on every response
//! - Input validation (pagination limits, required query parameters)
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use privy_core::db::Database;
use privy_core::{IngestionPipeline, MetadataProvider};

mod handlers;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// None when no metadata provider is configured; ingestion routes then return 503
    pub pipeline: Option<IngestionPipeline>,
}

impl AppState {
    /// The pipeline, or a 503 explaining how to enable it
    pub fn pipeline(&self) -> Result<&IngestionPipeline, AppError> {
        self.pipeline.as_ref().ok_or_else(|| {
            AppError::unavailable(
                "Metadata provider not configured (set PRIVY_METADATA_HOST to enable ingestion)",
            )
        })
    }
}

/// Generic success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(
    db: Database,
    pipeline: Option<IngestionPipeline>,
    config: ServerConfig,
) -> Router {
    let state = Arc::new(AppState { db, pipeline });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        // Ingestion
        .route("/scrape", get(handlers::scrape))
        .route("/scrapePolicy", get(handlers::scrape_policy))
        .route("/getAppDetails", get(handlers::get_app_details))
        // Catalog
        .route("/apps", get(handlers::list_apps))
        .route("/app/:app_id", get(handlers::get_app))
        .route("/sensitive-apps", get(handlers::list_sensitive_apps))
        // Manual review queue
        .route("/manual-review", get(handlers::list_manual_review))
        .route(
            "/manual-review/:app_id/resolve",
            post(handlers::resolve_manual_review),
        )
        // Run log
        .route("/runs", get(handlers::list_runs));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server
pub async fn serve(
    db: Database,
    pipeline: Option<IngestionPipeline>,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    serve_with_config(db, pipeline, host, port, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    pipeline: Option<IngestionPipeline>,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    check_metadata_connection(pipeline.as_ref()).await;

    let app = create_router(db, pipeline, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log metadata provider connection status
async fn check_metadata_connection(pipeline: Option<&IngestionPipeline>) {
    match pipeline {
        Some(pipeline) => {
            let metadata = pipeline.metadata();
            if metadata.health_check().await {
                info!("Metadata provider connected: {}", metadata.host());
            } else {
                warn!(
                    "Metadata provider configured but not responding: {}",
                    metadata.host()
                );
            }
        }
        None => {
            info!("Metadata provider not configured (set PRIVY_METADATA_HOST to enable ingestion)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
