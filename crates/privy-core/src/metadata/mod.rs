//! Pluggable app-store metadata providers
//!
//! # Architecture
//!
//! - `MetadataProvider` trait: the two lookups the pipeline needs
//! - `MetadataClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Implementations: `HttpMetadataProvider` (store-metadata sidecar), `MockMetadataProvider`
//!
//! # Configuration
//!
//! - `PRIVY_METADATA_HOST` / `[metadata] host`: sidecar base URL (required for http)
//! - `[metadata] timeout_secs`: per-request timeout (default: 30)

mod http;
mod mock;

pub use http::HttpMetadataProvider;
pub use mock::MockMetadataProvider;

use async_trait::async_trait;

use crate::config::MetadataConfig;
use crate::error::Result;
use crate::models::{AppDetails, Permission};

/// Trait defining the interface for metadata providers
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch title, policy URL, category, icon and permissions for an app
    ///
    /// Returns `Error::NotFound` when the store has no such app.
    async fn fetch(&self, app_id: &str) -> Result<AppDetails>;

    /// Fetch only the permission list
    ///
    /// Used when `fetch` came back without permissions; the dedicated
    /// endpoint sometimes still has them.
    async fn fetch_permissions_only(&self, app_id: &str) -> Result<Vec<Permission>>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> bool;

    /// Where lookups go (for logging)
    fn host(&self) -> &str;
}

/// Concrete metadata client enum
#[derive(Clone)]
pub enum MetadataClient {
    /// Store-metadata sidecar over HTTP
    Http(HttpMetadataProvider),
    /// Canned responses for testing
    Mock(MockMetadataProvider),
}

impl MetadataClient {
    /// Create a client from configuration
    ///
    /// Returns None if no sidecar host is configured.
    pub fn from_config(config: &MetadataConfig) -> Option<Self> {
        let host = config.host.as_deref()?;
        Some(MetadataClient::Http(HttpMetadataProvider::new(
            host,
            config.timeout,
        )))
    }

    /// Wrap a mock provider
    pub fn mock(mock: MockMetadataProvider) -> Self {
        MetadataClient::Mock(mock)
    }
}

#[async_trait]
impl MetadataProvider for MetadataClient {
    async fn fetch(&self, app_id: &str) -> Result<AppDetails> {
        match self {
            MetadataClient::Http(p) => p.fetch(app_id).await,
            MetadataClient::Mock(p) => p.fetch(app_id).await,
        }
    }

    async fn fetch_permissions_only(&self, app_id: &str) -> Result<Vec<Permission>> {
        match self {
            MetadataClient::Http(p) => p.fetch_permissions_only(app_id).await,
            MetadataClient::Mock(p) => p.fetch_permissions_only(app_id).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            MetadataClient::Http(p) => p.health_check().await,
            MetadataClient::Mock(p) => p.health_check().await,
        }
    }

    fn host(&self) -> &str {
        match self {
            MetadataClient::Http(p) => p.host(),
            MetadataClient::Mock(p) => p.host(),
        }
    }
}
