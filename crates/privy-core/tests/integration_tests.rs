//! Integration tests for privy-core
//!
//! These tests exercise the full sidecar → extraction → store workflow
//! through the public API, with a local axum sidecar and an in-test renderer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::Path, http::StatusCode, routing::get, Json, Router};
use privy_core::{
    Database, ExtractionConfig, IngestConfig, MetadataClient, MetadataConfig, Outcome,
    PageRenderer, PolicyTextExtractor, RenderedPage, ReviewStatus, TriageConfig,
};
use serde_json::{json, Value};

/// Renderer serving fixed body text per URL
struct StaticPages(HashMap<String, String>);

struct StaticPage(String);

impl PageRenderer for StaticPages {
    fn open(&self, url: &str) -> privy_core::Result<Box<dyn RenderedPage>> {
        match self.0.get(url) {
            Some(body) => Ok(Box::new(StaticPage(body.clone()))),
            None => Err(privy_core::Error::Extraction(format!(
                "net::ERR_NAME_NOT_RESOLVED at {}",
                url
            ))),
        }
    }
}

impl RenderedPage for StaticPage {
    fn body_text(&self) -> privy_core::Result<String> {
        Ok(self.0.clone())
    }

    fn button_labels(&self) -> privy_core::Result<Vec<String>> {
        Ok(vec![])
    }

    fn click_button(&self, _index: usize) -> privy_core::Result<()> {
        Ok(())
    }

    fn select_all_and_copy(&self) -> privy_core::Result<()> {
        Ok(())
    }

    fn read_clipboard(&self) -> privy_core::Result<String> {
        Ok(String::new())
    }
}

async fn sidecar_app(Path(app_id): Path<String>) -> Result<Json<Value>, StatusCode> {
    let body = match app_id.as_str() {
        "com.example.weather" => json!({
            "title": "Weather Now",
            "privacyPolicy": "https://weather.example.com/privacy",
            "genre": "Weather",
            "icon": "https://weather.example.com/icon.png",
            "permissions": [{ "permission": "ACCESS_FINE_LOCATION", "type": "dangerous" }]
        }),
        "com.example.spa" => json!({
            "title": "Single Page",
            "privacyPolicy": "https://spa.example.com/privacy",
            "genre": "Tools",
            "icon": "https://spa.example.com/icon.png"
        }),
        "com.example.pharmacy" => json!({
            "title": "Pharmacy",
            "privacyPolicy": "https://pharmacy.example.com/privacy",
            "genre": "Medical",
            "icon": "https://pharmacy.example.com/icon.png"
        }),
        _ => return Err(StatusCode::NOT_FOUND),
    };
    Ok(Json(body))
}

async fn sidecar_permissions(Path(_app_id): Path<String>) -> Json<Value> {
    Json(json!([]))
}

/// Start a throwaway sidecar, returning its base URL
async fn start_sidecar() -> String {
    let app = Router::new()
        .route("/apps/:app_id", get(sidecar_app))
        .route("/apps/:app_id/permissions", get(sidecar_permissions));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn pipeline(db: &Database, host: &str) -> privy_core::IngestionPipeline {
    let mut pages = HashMap::new();
    pages.insert(
        "https://weather.example.com/privacy".to_string(),
        "Weather Now uses your location to show local forecasts. ".repeat(3),
    );
    pages.insert(
        "https://spa.example.com/privacy".to_string(),
        "Loading…".to_string(),
    );

    let config = ExtractionConfig {
        clipboard_settle: Duration::from_millis(0),
        ..ExtractionConfig::default()
    };
    let metadata = MetadataClient::from_config(&MetadataConfig {
        host: Some(host.to_string()),
        timeout: Duration::from_secs(5),
    })
    .expect("host is configured");

    privy_core::IngestionPipeline::new(
        db.clone(),
        metadata,
        PolicyTextExtractor::new(Arc::new(StaticPages(pages)), &config),
        TriageConfig::default(),
    )
}

// =============================================================================
// Pipeline Integration Tests
// =============================================================================

#[tokio::test]
async fn test_full_ingest_workflow() {
    let host = start_sidecar().await;
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let pipeline = pipeline(&db, &host);

    let outcome = pipeline.process("com.example.weather").await;
    assert_eq!(outcome.kind(), "saved");

    let apps = db.list_app_summaries().unwrap();
    assert_eq!(apps.len(), 1);
    assert_eq!(apps[0].app_name, "Weather Now");
    assert_eq!(
        apps[0].icon_url.as_deref(),
        Some("https://weather.example.com/icon.png")
    );

    let policy = db.get_policy("com.example.weather").unwrap().unwrap();
    assert_eq!(policy.permissions, "ACCESS_FINE_LOCATION (dangerous)");
    assert_eq!(policy.category, "Weather");

    assert_eq!(
        pipeline.process("com.example.weather").await,
        Outcome::AlreadyPresent
    );
}

#[tokio::test]
async fn test_unknown_app_goes_to_manual_review() {
    let host = start_sidecar().await;
    let db = Database::in_memory().unwrap();
    let pipeline = pipeline(&db, &host);

    let report = pipeline.trigger_ingestion("com.example.ghost").await;
    assert_eq!(report.outcome, "flagged_for_review");

    let pending = db.list_manual_review(Some(ReviewStatus::Pending)).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].app_name, "Unknown");
}

#[tokio::test]
async fn test_app_id_with_url_syntax_never_borrows_another_record() {
    let host = start_sidecar().await;
    let db = Database::in_memory().unwrap();
    let pipeline = pipeline(&db, &host);

    for app_id in ["com.example.weather#x", "com.example.weather?x=1"] {
        let outcome = pipeline.process(app_id).await;
        assert_eq!(outcome.kind(), "flagged_for_review", "{}", app_id);
        assert!(db.get_policy(app_id).unwrap().is_none());
    }
    assert_eq!(db.store_stats().unwrap().policies, 0);
}

#[tokio::test]
async fn test_mixed_batch_lands_in_the_right_tables() {
    let host = start_sidecar().await;
    let db = Database::in_memory().unwrap();
    let pipeline = pipeline(&db, &host);

    for app_id in ["com.example.weather", "com.example.spa", "com.example.pharmacy"] {
        let outcome = pipeline.process(app_id).await;
        assert!(!outcome.is_failure(), "{} failed: {:?}", app_id, outcome);
    }
    // Retry the SPA: second extraction failure closes its review row
    pipeline.process("com.example.spa").await;

    let stats = db.store_stats().unwrap();
    assert_eq!(stats.policies, 1);
    assert_eq!(stats.sensitive_apps, 1);
    assert_eq!(stats.pending_review, 0);
    assert_eq!(stats.reviewed, 1);
    assert_eq!(stats.ingest_runs, 4);

    let spa = db.get_manual_review("com.example.spa").unwrap().unwrap();
    assert_eq!(spa.reason, "extraction failed twice");
    assert_eq!(spa.permissions, "None");
}

#[test]
fn test_embedded_config_defaults() {
    let config = IngestConfig::load(Some(std::path::Path::new("/nonexistent/ingest.toml")))
        .expect("embedded config parses");
    assert!(config.triage.is_sensitive("Finance"));
    assert!(config.triage.is_sensitive("Medical"));
    assert_eq!(config.extraction.min_text_chars, 50);
}
