//! Privy Core Library
//!
//! Shared functionality for the Privy privacy-policy ingestion service:
//! - Database access and migrations
//! - Pluggable app-store metadata providers (HTTP sidecar, mock)
//! - Policy page text extraction through a headless browser
//! - The ingestion pipeline with category triage and manual review
//! - Configuration with embedded defaults

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod ingest;
pub mod metadata;
pub mod models;

/// Test utilities including mock metadata server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{ExtractionConfig, IngestConfig, MetadataConfig, TriageConfig};
pub use db::{Database, PolicyInsertResult};
pub use error::{Error, Result};
pub use extract::{
    ChromeRenderer, Extraction, PageRenderer, PolicyTextExtractor, RenderedPage, EXTRACTION_ERROR,
    NO_POLICY_FOUND,
};
#[cfg(any(test, feature = "test-utils"))]
pub use extract::ScriptedRenderer;
pub use ingest::{IngestReport, IngestionPipeline, Outcome, PolicyText};
pub use metadata::{HttpMetadataProvider, MetadataClient, MetadataProvider, MockMetadataProvider};
pub use models::*;
