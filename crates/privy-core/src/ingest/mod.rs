//! Ingestion pipeline
//!
//! Takes an app identifier through existence checks, metadata lookup,
//! category triage and policy extraction, and records exactly one result:
//! a saved policy, a sensitive-app registration, or a manual-review row.
//!
//! Collaborator failures (store metadata, page rendering) become outcomes.
//! Only store failures surface as [`Outcome::Failed`].

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{IngestConfig, TriageConfig};
use crate::db::{Database, PolicyInsertResult};
use crate::error::{Error, Result};
use crate::extract::{is_meaningful, meaningful_len, Extraction, PolicyTextExtractor};
use crate::metadata::{MetadataClient, MetadataProvider};
use crate::models::{
    format_permissions, AppDetails, IconEntry, ManualReviewEntry, NewManualReview, Permission,
    PolicyEntry, ReviewStatus, NO_PERMISSIONS,
};

/// Manual review reasons written by the pipeline
pub mod reasons {
    pub const NO_POLICY_URL: &str = "no policy URL available";
    pub const EXTRACTION_FAILED: &str = "extraction failed";
    pub const EXTRACTION_FAILED_TWICE: &str = "extraction failed twice";
    pub const RESOLVED_BY_RETRY: &str = "resolved by automatic retry";
}

/// App name recorded when the store could not tell us one
const UNKNOWN_APP_NAME: &str = "Unknown";

/// What one `process()` call did
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A policy row already existed; nothing was fetched
    AlreadyPresent,
    /// A human already dispositioned this app
    SkippedReviewed,
    /// Saved on retry of a pending manual-review app; the queue row is closed
    Reprocessed { entry: PolicyEntry, icon_saved: bool },
    /// Category is sensitive; registered instead of analyzed
    SensitiveDiverted { category: String },
    /// Queued for a human
    FlaggedForReview { reason: String },
    Saved { entry: PolicyEntry, icon_saved: bool },
    /// The store rejected a read or write
    Failed(String),
}

impl Outcome {
    /// Stable identifier, as logged in `ingest_runs`
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::AlreadyPresent => "already_present",
            Outcome::SkippedReviewed => "skipped_reviewed",
            Outcome::Reprocessed { .. } => "reprocessed",
            Outcome::SensitiveDiverted { .. } => "sensitive_diverted",
            Outcome::FlaggedForReview { .. } => "flagged_for_review",
            Outcome::Saved { .. } => "saved",
            Outcome::Failed(_) => "failed",
        }
    }

    /// Saved entry, for the two committing outcomes
    pub fn entry(&self) -> Option<&PolicyEntry> {
        match self {
            Outcome::Saved { entry, .. } | Outcome::Reprocessed { entry, .. } => Some(entry),
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    /// One-line description for operators
    pub fn message(&self, app_id: &str) -> String {
        match self {
            Outcome::AlreadyPresent => format!("{} is already in the database", app_id),
            Outcome::SkippedReviewed => {
                format!("{} was already reviewed manually, skipping", app_id)
            }
            Outcome::Reprocessed { entry, icon_saved } => format!(
                "saved privacy policy for '{}' on retry{}",
                entry.app_name,
                icon_note(*icon_saved)
            ),
            Outcome::SensitiveDiverted { category } => {
                format!("{} is in sensitive category {}", app_id, category)
            }
            Outcome::FlaggedForReview { reason } => {
                format!("{} marked for manual review: {}", app_id, reason)
            }
            Outcome::Saved { entry, icon_saved } => format!(
                "saved privacy policy for '{}'{}",
                entry.app_name,
                icon_note(*icon_saved)
            ),
            Outcome::Failed(error) => format!("failed to process {}: {}", app_id, error),
        }
    }
}

fn icon_note(icon_saved: bool) -> &'static str {
    if icon_saved {
        ""
    } else {
        " (icon not saved)"
    }
}

/// Result of a triggered ingestion, as reported to callers
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub app_id: String,
    pub outcome: String,
    pub message: String,
}

/// Extracted policy text for an ad-hoc URL
#[derive(Debug, Clone, Serialize)]
pub struct PolicyText {
    pub url: String,
    pub policy_text: String,
    /// Non-whitespace characters, the measure the threshold applies to
    pub meaningful_chars: usize,
}

/// The ingestion pipeline
#[derive(Clone)]
pub struct IngestionPipeline {
    db: Database,
    metadata: MetadataClient,
    extractor: PolicyTextExtractor,
    triage: TriageConfig,
}

impl IngestionPipeline {
    pub fn new(
        db: Database,
        metadata: MetadataClient,
        extractor: PolicyTextExtractor,
        triage: TriageConfig,
    ) -> Self {
        Self {
            db,
            metadata,
            extractor,
            triage,
        }
    }

    /// Pipeline with the headless Chrome extractor
    pub fn from_config(db: Database, metadata: MetadataClient, config: &IngestConfig) -> Self {
        Self::new(
            db,
            metadata,
            PolicyTextExtractor::chrome(&config.extraction),
            config.triage.clone(),
        )
    }

    pub fn metadata(&self) -> &MetadataClient {
        &self.metadata
    }

    /// Ingest one app and log the run
    pub async fn process(&self, app_id: &str) -> Outcome {
        info!(app_id = %app_id, "Processing app");
        let outcome = self.run(app_id).await;

        let message = outcome.message(app_id);
        match &outcome {
            Outcome::Failed(_) => warn!(app_id = %app_id, "{}", message),
            _ => info!(app_id = %app_id, outcome = outcome.kind(), "{}", message),
        }

        if let Err(e) = self.db.log_ingest_run(app_id, outcome.kind(), &message) {
            warn!(app_id = %app_id, error = %e, "Failed to log ingestion run");
        }

        outcome
    }

    /// Ingest one app, reporting the outcome as a message
    pub async fn trigger_ingestion(&self, app_id: &str) -> IngestReport {
        let outcome = self.process(app_id).await;
        IngestReport {
            app_id: app_id.to_string(),
            outcome: outcome.kind().to_string(),
            message: outcome.message(app_id),
        }
    }

    /// Extract policy text from a URL without touching the store
    ///
    /// Returns `Error::NotFound` when the page holds too little text.
    pub async fn extract_policy_text(&self, url: &str) -> Result<PolicyText> {
        match self.extractor.extract(url).await {
            Extraction::Text(policy_text) => Ok(PolicyText {
                url: url.to_string(),
                meaningful_chars: meaningful_len(&policy_text),
                policy_text,
            }),
            Extraction::NotFound => Err(Error::NotFound(format!(
                "privacy policy not found at {}",
                url
            ))),
            Extraction::Error(msg) => Err(Error::Extraction(msg)),
        }
    }

    async fn run(&self, app_id: &str) -> Outcome {
        match self.db.has_policy(app_id) {
            Ok(true) => return Outcome::AlreadyPresent,
            Ok(false) => {}
            Err(e) => return Outcome::Failed(e.to_string()),
        }

        let pending = match self.db.get_manual_review(app_id) {
            Ok(Some(entry)) if entry.status == ReviewStatus::Reviewed => {
                return Outcome::SkippedReviewed
            }
            Ok(Some(entry)) => {
                info!(app_id = %app_id, reason = %entry.reason, "Re-processing pending manual review");
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => return Outcome::Failed(e.to_string()),
        };

        let details = match self.metadata.fetch(app_id).await {
            Ok(details) => details,
            Err(e) => {
                warn!(app_id = %app_id, error = %e, "Metadata lookup failed");
                return self.flag(NewManualReview {
                    app_id: app_id.to_string(),
                    app_name: UNKNOWN_APP_NAME.to_string(),
                    policy_url: None,
                    permissions: NO_PERMISSIONS.to_string(),
                    category: None,
                    reason: e.to_string(),
                    status: ReviewStatus::Pending,
                });
            }
        };

        let Some(policy_url) = details.privacy_policy_url.clone() else {
            return self.flag(NewManualReview {
                app_id: app_id.to_string(),
                app_name: details.title.clone(),
                policy_url: None,
                permissions: format_permissions(&details.permissions),
                category: Some(details.category.clone()),
                reason: reasons::NO_POLICY_URL.to_string(),
                status: ReviewStatus::Pending,
            });
        };

        let permissions = self.resolve_permissions(&details).await;

        if self.triage.is_sensitive(&details.category) {
            return self.divert_sensitive(&details);
        }

        let extraction = self.extractor.extract(&policy_url).await;
        let policy_text = match extraction {
            Extraction::Text(text) if is_meaningful(&text, self.extractor.min_text_chars()) => text,
            other => {
                debug!(app_id = %app_id, result = other.as_str(), "No usable policy text");
                let (reason, status) = match pending {
                    Some(_) => (reasons::EXTRACTION_FAILED_TWICE, ReviewStatus::Reviewed),
                    None => (reasons::EXTRACTION_FAILED, ReviewStatus::Pending),
                };
                return self.flag(NewManualReview {
                    app_id: app_id.to_string(),
                    app_name: details.title.clone(),
                    policy_url: Some(policy_url),
                    permissions: format_permissions(&permissions),
                    category: Some(details.category.clone()),
                    reason: reason.to_string(),
                    status,
                });
            }
        };

        let entry = PolicyEntry::unrated(&details, &policy_url, policy_text, permissions);
        self.commit(entry, &details, pending.as_ref())
    }

    /// Permissions from the detail record, else the dedicated lookup
    async fn resolve_permissions(&self, details: &AppDetails) -> Vec<Permission> {
        if !details.permissions.is_empty() {
            return details.permissions.clone();
        }

        match self.metadata.fetch_permissions_only(&details.app_id).await {
            Ok(permissions) => permissions,
            Err(e) => {
                debug!(app_id = %details.app_id, error = %e, "Permission lookup failed, recording none");
                Vec::new()
            }
        }
    }

    fn divert_sensitive(&self, details: &AppDetails) -> Outcome {
        match self.db.has_sensitive_entry(&details.app_id) {
            Ok(true) => {
                debug!(app_id = %details.app_id, "Already registered as sensitive");
            }
            Ok(false) => {
                if let Err(e) = self.db.insert_sensitive_app(
                    &details.app_id,
                    &details.title,
                    &details.category,
                ) {
                    return Outcome::Failed(e.to_string());
                }
            }
            Err(e) => return Outcome::Failed(e.to_string()),
        }

        Outcome::SensitiveDiverted {
            category: details.category.clone(),
        }
    }

    fn flag(&self, review: NewManualReview) -> Outcome {
        match self.db.upsert_manual_review(&review) {
            Ok(()) => Outcome::FlaggedForReview {
                reason: review.reason,
            },
            Err(e) => Outcome::Failed(e.to_string()),
        }
    }

    fn commit(
        &self,
        entry: PolicyEntry,
        details: &AppDetails,
        pending: Option<&ManualReviewEntry>,
    ) -> Outcome {
        match self.db.insert_policy(&entry) {
            Ok(PolicyInsertResult::Inserted) => {}
            Ok(PolicyInsertResult::AlreadyPresent) => return Outcome::AlreadyPresent,
            Err(e) => return Outcome::Failed(e.to_string()),
        }

        let icon = IconEntry {
            app_id: entry.app_id.clone(),
            icon_url: details.icon_url.clone(),
        };
        let icon_saved = match self.db.upsert_icon(&icon) {
            Ok(()) => true,
            Err(e) => {
                warn!(app_id = %entry.app_id, error = %e, "Saved policy but not its icon");
                false
            }
        };

        if pending.is_none() {
            return Outcome::Saved { entry, icon_saved };
        }

        if let Err(e) = self
            .db
            .resolve_manual_review(&entry.app_id, Some(reasons::RESOLVED_BY_RETRY))
        {
            warn!(app_id = %entry.app_id, error = %e, "Failed to close manual review row");
        }
        Outcome::Reprocessed { entry, icon_saved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::extract::{PageRenderer, RenderedPage, ScriptedRenderer};
    use crate::metadata::MockMetadataProvider;
    use std::sync::Arc;
    use std::time::Duration;

    const POLICY_URL: &str = "https://example.com/privacy";

    fn app(app_id: &str, category: &str) -> AppDetails {
        AppDetails {
            app_id: app_id.to_string(),
            title: format!("{} title", app_id),
            privacy_policy_url: Some(POLICY_URL.to_string()),
            category: category.to_string(),
            icon_url: Some("https://example.com/icon.png".to_string()),
            permissions: vec![Permission::new("INTERNET", Some("normal"))],
        }
    }

    fn long_policy() -> String {
        "We collect the data you give us and nothing else. ".repeat(4)
    }

    struct Harness {
        pipeline: IngestionPipeline,
        db: Database,
        mock: MockMetadataProvider,
        renderer: ScriptedRenderer,
    }

    fn harness(mock: MockMetadataProvider, renderer: ScriptedRenderer) -> Harness {
        let db = Database::in_memory().unwrap();
        let config = ExtractionConfig {
            clipboard_settle: Duration::from_millis(0),
            ..ExtractionConfig::default()
        };
        let extractor = PolicyTextExtractor::new(Arc::new(renderer.clone()), &config);
        let pipeline = IngestionPipeline::new(
            db.clone(),
            MetadataClient::mock(mock.clone()),
            extractor,
            TriageConfig::default(),
        );
        Harness {
            pipeline,
            db,
            mock,
            renderer,
        }
    }

    #[tokio::test]
    async fn test_saves_policy_and_icon() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.notes", "Productivity")),
            ScriptedRenderer::new().with_body(&long_policy()),
        );

        let outcome = h.pipeline.process("com.example.notes").await;
        let Outcome::Saved { entry, icon_saved } = &outcome else {
            panic!("expected Saved, got {:?}", outcome);
        };
        assert!(*icon_saved);
        assert_eq!(entry.permissions, "INTERNET (normal)");
        assert_eq!(entry.rating, None);

        let stored = h.db.get_policy("com.example.notes").unwrap().unwrap();
        assert_eq!(stored.policy_url, POLICY_URL);
        assert_eq!(stored.policy_text, long_policy().trim());
        let icon = h.db.get_icon("com.example.notes").unwrap().unwrap();
        assert_eq!(icon.icon_url.as_deref(), Some("https://example.com/icon.png"));
    }

    #[tokio::test]
    async fn test_second_run_is_already_present_without_calls() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.notes", "Productivity")),
            ScriptedRenderer::new().with_body(&long_policy()),
        );

        h.pipeline.process("com.example.notes").await;
        let fetches = h.mock.fetch_calls();
        let opens = h.renderer.opened_urls().len();

        assert_eq!(
            h.pipeline.process("com.example.notes").await,
            Outcome::AlreadyPresent
        );
        assert_eq!(h.mock.fetch_calls(), fetches);
        assert_eq!(h.renderer.opened_urls().len(), opens);
        assert_eq!(h.db.store_stats().unwrap().policies, 1);
    }

    #[tokio::test]
    async fn test_sensitive_category_registered_once() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.bank", "Finance")),
            ScriptedRenderer::new().with_body(&long_policy()),
        );

        for _ in 0..5 {
            let outcome = h.pipeline.process("com.example.bank").await;
            assert_eq!(
                outcome,
                Outcome::SensitiveDiverted {
                    category: "Finance".to_string()
                }
            );
        }

        let stats = h.db.store_stats().unwrap();
        assert_eq!(stats.sensitive_apps, 1);
        assert_eq!(stats.policies, 0);
        assert!(h.renderer.opened_urls().is_empty());
    }

    #[tokio::test]
    async fn test_sensitive_match_ignores_case() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.clinic", "medical")),
            ScriptedRenderer::new(),
        );

        let outcome = h.pipeline.process("com.example.clinic").await;
        assert_eq!(outcome.kind(), "sensitive_diverted");
    }

    #[tokio::test]
    async fn test_missing_policy_url_flags_without_extraction() {
        let mut details = app("com.example.nopolicy", "Tools");
        details.privacy_policy_url = None;
        let h = harness(
            MockMetadataProvider::new().with_app(details),
            ScriptedRenderer::new().with_body(&long_policy()),
        );

        let outcome = h.pipeline.process("com.example.nopolicy").await;
        assert_eq!(
            outcome,
            Outcome::FlaggedForReview {
                reason: reasons::NO_POLICY_URL.to_string()
            }
        );
        assert!(h.renderer.opened_urls().is_empty());

        let review = h.db.get_manual_review("com.example.nopolicy").unwrap().unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);
        assert_eq!(review.app_name, "com.example.nopolicy title");
        assert!(review.policy_url.is_none());
    }

    #[tokio::test]
    async fn test_metadata_failure_flags_unknown_app() {
        let h = harness(
            MockMetadataProvider::new().with_failure("com.example.flaky", "store rate limited"),
            ScriptedRenderer::new(),
        );

        let outcome = h.pipeline.process("com.example.flaky").await;
        assert_eq!(outcome.kind(), "flagged_for_review");

        let review = h.db.get_manual_review("com.example.flaky").unwrap().unwrap();
        assert_eq!(review.app_name, "Unknown");
        assert_eq!(review.permissions, "None");
        assert!(review.reason.contains("store rate limited"));
    }

    #[tokio::test]
    async fn test_extraction_failure_then_retry_failure() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.spa", "Tools")),
            ScriptedRenderer::new().with_body("Loading"),
        );

        let first = h.pipeline.process("com.example.spa").await;
        assert_eq!(
            first,
            Outcome::FlaggedForReview {
                reason: reasons::EXTRACTION_FAILED.to_string()
            }
        );
        let review = h.db.get_manual_review("com.example.spa").unwrap().unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);

        let second = h.pipeline.process("com.example.spa").await;
        assert_eq!(second.kind(), "flagged_for_review");
        let review = h.db.get_manual_review("com.example.spa").unwrap().unwrap();
        assert_eq!(review.status, ReviewStatus::Reviewed);
        assert!(review.reason.contains("twice"));

        // A reviewed app is not touched again
        let fetches = h.mock.fetch_calls();
        assert_eq!(
            h.pipeline.process("com.example.spa").await,
            Outcome::SkippedReviewed
        );
        assert_eq!(h.mock.fetch_calls(), fetches);
    }

    #[tokio::test]
    async fn test_render_error_flags_for_review() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.down", "Tools")),
            ScriptedRenderer::new().failing("net::ERR_CONNECTION_REFUSED"),
        );

        let outcome = h.pipeline.process("com.example.down").await;
        assert_eq!(
            outcome,
            Outcome::FlaggedForReview {
                reason: reasons::EXTRACTION_FAILED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_pending_app_saved_on_retry_is_reprocessed() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.notes", "Productivity")),
            ScriptedRenderer::new().with_body(&long_policy()),
        );
        h.db.upsert_manual_review(&NewManualReview {
            app_id: "com.example.notes".to_string(),
            app_name: "Notes".to_string(),
            policy_url: Some(POLICY_URL.to_string()),
            permissions: "None".to_string(),
            category: Some("Productivity".to_string()),
            reason: reasons::EXTRACTION_FAILED.to_string(),
            status: ReviewStatus::Pending,
        })
        .unwrap();

        let outcome = h.pipeline.process("com.example.notes").await;
        assert_eq!(outcome.kind(), "reprocessed");
        assert!(outcome.entry().is_some());

        let review = h.db.get_manual_review("com.example.notes").unwrap().unwrap();
        assert_eq!(review.status, ReviewStatus::Reviewed);
        assert_eq!(review.reason, reasons::RESOLVED_BY_RETRY);
    }

    #[tokio::test]
    async fn test_permissions_fall_back_to_dedicated_lookup() {
        let mut details = app("com.example.cam", "Photography");
        details.permissions.clear();
        let h = harness(
            MockMetadataProvider::new()
                .with_app(details)
                .with_permissions("com.example.cam", vec![Permission::new("CAMERA", Some("dangerous"))]),
            ScriptedRenderer::new().with_body(&long_policy()),
        );

        let outcome = h.pipeline.process("com.example.cam").await;
        assert_eq!(outcome.entry().unwrap().permissions, "CAMERA (dangerous)");
        assert_eq!(h.mock.permission_calls(), 1);

        let stored = h.db.get_policy("com.example.cam").unwrap().unwrap();
        assert_eq!(stored.permissions, "CAMERA (dangerous)");
    }

    #[tokio::test]
    async fn test_no_permissions_anywhere_records_none() {
        let mut details = app("com.example.plain", "Tools");
        details.permissions.clear();
        let h = harness(
            MockMetadataProvider::new().with_app(details),
            ScriptedRenderer::new().with_body(&long_policy()),
        );

        let outcome = h.pipeline.process("com.example.plain").await;
        assert_eq!(outcome.entry().unwrap().permissions, "None");
    }

    #[tokio::test]
    async fn test_clipboard_fallback_text_is_committed() {
        let copied = "c".repeat(200);
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.canvas", "Tools")),
            ScriptedRenderer::new().with_body("").with_clipboard(&copied),
        );

        let outcome = h.pipeline.process("com.example.canvas").await;
        assert_eq!(outcome.kind(), "saved");
        assert_eq!(h.renderer.copy_attempts(), 1);
        assert_eq!(
            h.db.get_policy("com.example.canvas").unwrap().unwrap().policy_text,
            copied
        );
    }

    #[tokio::test]
    async fn test_every_run_is_logged() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.notes", "Productivity")),
            ScriptedRenderer::new().with_body(&long_policy()),
        );

        h.pipeline.process("com.example.notes").await;
        h.pipeline.process("com.example.notes").await;

        let runs = h.db.list_ingest_runs(Some("com.example.notes"), 10).unwrap();
        let kinds: Vec<_> = runs.iter().map(|r| r.outcome.as_str()).collect();
        assert_eq!(kinds, vec!["already_present", "saved"]);
    }

    #[tokio::test]
    async fn test_trigger_ingestion_reports_message() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.bank", "Finance")),
            ScriptedRenderer::new(),
        );

        let report = h.pipeline.trigger_ingestion("com.example.bank").await;
        assert_eq!(report.outcome, "sensitive_diverted");
        assert!(report.message.contains("Finance"));
    }

    #[tokio::test]
    async fn test_extract_policy_text() {
        let h = harness(
            MockMetadataProvider::new(),
            ScriptedRenderer::new().with_body(&long_policy()),
        );
        let text = h.pipeline.extract_policy_text(POLICY_URL).await.unwrap();
        assert_eq!(text.url, POLICY_URL);
        assert_eq!(text.meaningful_chars, meaningful_len(&text.policy_text));
        assert!(text.meaningful_chars < text.policy_text.chars().count());

        let short = harness(MockMetadataProvider::new(), ScriptedRenderer::new().with_body("hi"));
        let err = short.pipeline.extract_policy_text(POLICY_URL).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    /// Commits a rival row for the app when the page opens, like a
    /// concurrent run finishing first
    struct RivalCommitRenderer {
        db: Database,
        inner: ScriptedRenderer,
    }

    impl PageRenderer for RivalCommitRenderer {
        fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>> {
            let rival = PolicyEntry::unrated(
                &app("com.example.notes", "Productivity"),
                url,
                "Committed by the other run.".to_string(),
                Vec::new(),
            );
            self.db.insert_policy(&rival)?;
            self.inner.open(url)
        }
    }

    #[tokio::test]
    async fn test_concurrent_commit_is_already_present() {
        let db = Database::in_memory().unwrap();
        let config = ExtractionConfig {
            clipboard_settle: Duration::from_millis(0),
            ..ExtractionConfig::default()
        };
        let renderer = RivalCommitRenderer {
            db: db.clone(),
            inner: ScriptedRenderer::new().with_body(&long_policy()),
        };
        let pipeline = IngestionPipeline::new(
            db.clone(),
            MetadataClient::mock(
                MockMetadataProvider::new().with_app(app("com.example.notes", "Productivity")),
            ),
            PolicyTextExtractor::new(Arc::new(renderer), &config),
            TriageConfig::default(),
        );

        assert_eq!(
            pipeline.process("com.example.notes").await,
            Outcome::AlreadyPresent
        );
        let stored = db.get_policy("com.example.notes").unwrap().unwrap();
        assert_eq!(stored.policy_text, "Committed by the other run.");
        assert!(db.get_icon("com.example.notes").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_policy_write_failure_is_failed() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.notes", "Productivity")),
            ScriptedRenderer::new().with_body(&long_policy()),
        );
        h.db.conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_policies BEFORE INSERT ON policies
                 BEGIN SELECT RAISE(ABORT, 'disk is full'); END;",
            )
            .unwrap();

        let outcome = h.pipeline.process("com.example.notes").await;
        let Outcome::Failed(message) = &outcome else {
            panic!("expected Failed, got {:?}", outcome);
        };
        assert!(message.contains("disk is full"));
        assert!(outcome.is_failure());
        assert!(!h.db.has_policy("com.example.notes").unwrap());

        let runs = h.db.list_ingest_runs(Some("com.example.notes"), 10).unwrap();
        assert_eq!(runs[0].outcome, "failed");
    }

    #[tokio::test]
    async fn test_icon_write_failure_keeps_policy() {
        let h = harness(
            MockMetadataProvider::new().with_app(app("com.example.notes", "Productivity")),
            ScriptedRenderer::new().with_body(&long_policy()),
        );
        h.db.conn()
            .unwrap()
            .execute_batch("DROP TABLE app_icons;")
            .unwrap();

        let outcome = h.pipeline.process("com.example.notes").await;
        let Outcome::Saved { icon_saved, .. } = &outcome else {
            panic!("expected Saved, got {:?}", outcome);
        };
        assert!(!*icon_saved);
        assert!(h.db.has_policy("com.example.notes").unwrap());
    }
}
