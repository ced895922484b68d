//! Test utilities for privy-core
//!
//! This module provides testing infrastructure including a mock store-metadata
//! sidecar that can be used for development and integration tests.
//!
//! Canned apps:
//! - `com.example.notes`: full record with a policy URL and two permissions
//! - `com.example.nopolicy`: blank policy URL, permissions only via the dedicated endpoint
//! - `com.example.bank`: Finance category
//!
//! Anything else is a 404.

use axum::{
    extract::{Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Mock store-metadata server for testing and development
pub struct MockMetadataServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockMetadataServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/apps/:app_id", get(handle_app))
            .route("/apps/:app_id/permissions", get(handle_permissions));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockMetadataServer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// App detail endpoint, in the store scraper's field naming
async fn handle_app(Path(app_id): Path<String>) -> Response {
    match canned_app(&app_id) {
        Some(body) => Json(body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Permissions-only endpoint
async fn handle_permissions(Path(app_id): Path<String>) -> Response {
    let body = match app_id.as_str() {
        "com.example.notes" => json!([
            { "permission": "INTERNET", "type": "normal" },
            { "permission": "READ_CONTACTS" }
        ]),
        "com.example.nopolicy" => json!([{ "permission": "CAMERA", "type": "dangerous" }]),
        "com.example.bank" => json!([]),
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    Json(body).into_response()
}

fn canned_app(app_id: &str) -> Option<Value> {
    let body = match app_id {
        "com.example.notes" => json!({
            "title": "Example Notes",
            "privacyPolicy": "https://example.com/privacy",
            "genre": "Productivity",
            "icon": "https://example.com/notes.png",
            "permissions": [
                { "permission": "INTERNET", "type": "normal" },
                { "permission": "READ_CONTACTS" }
            ]
        }),
        "com.example.nopolicy" => json!({
            "title": "No Policy",
            "privacyPolicy": "",
            "genre": "Tools",
            "icon": "https://example.com/nopolicy.png"
        }),
        "com.example.bank" => json!({
            "title": "Example Bank",
            "privacyPolicy": "https://bank.example.com/privacy",
            "genre": "Finance",
            "icon": "https://example.com/bank.png",
            "permissions": []
        }),
        _ => return None,
    };
    Some(body)
}
