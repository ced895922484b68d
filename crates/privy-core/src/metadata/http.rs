//! Store-metadata sidecar client
//!
//! The sidecar wraps an app-store scraper and returns its JSON unchanged:
//!
//! - `GET {host}/apps/{id}` → `{ title, privacyPolicy?, genre, icon, permissions?: [{permission, type?}] }`
//! - `GET {host}/apps/{id}/permissions` → `[{permission, type?}]`
//! - `GET {host}/health` → 200 when up
//!
//! A 404 on either lookup means the store has no such app.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AppDetails, Permission};

use super::MetadataProvider;

/// HTTP metadata provider
#[derive(Clone)]
pub struct HttpMetadataProvider {
    http_client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpMetadataProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// `{base}/{segments...}` with every segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Config(format!("invalid metadata host {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("metadata host {} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        app_id: &str,
        suffix: Option<&str>,
    ) -> Result<T> {
        // The URL builder drops dot segments, which would address another resource
        if matches!(app_id.trim(), "" | "." | "..") {
            return Err(Error::Metadata(format!("invalid app id {:?}", app_id)));
        }

        let mut segments = vec!["apps", app_id];
        segments.extend(suffix);
        let url = self.endpoint(&segments)?;
        debug!(url = %url, "Fetching app metadata");

        let response = self
            .http_client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(format!("app {} not found in store", app_id)));
        }
        if !response.status().is_success() {
            return Err(Error::Metadata(format!(
                "metadata lookup for {} failed with HTTP {}",
                app_id,
                response.status()
            )));
        }

        Ok(response.json().await?)
    }
}

/// App payload in the scraper's field naming
#[derive(Debug, Deserialize)]
struct RawAppDetails {
    title: String,
    #[serde(rename = "privacyPolicy")]
    privacy_policy: Option<String>,
    genre: Option<String>,
    icon: Option<String>,
    permissions: Option<Vec<RawPermission>>,
}

#[derive(Debug, Deserialize)]
struct RawPermission {
    permission: String,
    #[serde(rename = "type")]
    kind: Option<String>,
}

impl From<RawPermission> for Permission {
    fn from(raw: RawPermission) -> Self {
        Permission {
            name: raw.permission,
            kind: raw.kind.filter(|k| !k.trim().is_empty()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl MetadataProvider for HttpMetadataProvider {
    async fn fetch(&self, app_id: &str) -> Result<AppDetails> {
        let raw: RawAppDetails = self.get_json(app_id, None).await?;

        Ok(AppDetails {
            app_id: app_id.to_string(),
            title: raw.title,
            privacy_policy_url: non_empty(raw.privacy_policy),
            category: non_empty(raw.genre).unwrap_or_else(|| "Unknown".to_string()),
            icon_url: non_empty(raw.icon),
            permissions: raw
                .permissions
                .unwrap_or_default()
                .into_iter()
                .map(Permission::from)
                .collect(),
        })
    }

    async fn fetch_permissions_only(&self, app_id: &str) -> Result<Vec<Permission>> {
        let raw: Vec<RawPermission> = self.get_json(app_id, Some("permissions")).await?;
        Ok(raw.into_iter().map(Permission::from).collect())
    }

    async fn health_check(&self) -> bool {
        let Ok(url) = self.endpoint(&["health"]) else {
            return false;
        };
        match self
            .http_client
            .get(url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockMetadataServer;

    #[tokio::test]
    async fn test_fetch_maps_scraper_fields() {
        let mut server = MockMetadataServer::start().await;
        let provider = HttpMetadataProvider::new(&server.url(), Duration::from_secs(5));

        let details = provider.fetch("com.example.notes").await.unwrap();
        assert_eq!(details.app_id, "com.example.notes");
        assert_eq!(details.title, "Example Notes");
        assert_eq!(
            details.privacy_policy_url.as_deref(),
            Some("https://example.com/privacy")
        );
        assert_eq!(details.category, "Productivity");
        assert_eq!(details.permissions.len(), 2);
        assert_eq!(details.permissions[1].kind, None);

        server.stop();
    }

    #[tokio::test]
    async fn test_blank_policy_url_is_none() {
        let mut server = MockMetadataServer::start().await;
        let provider = HttpMetadataProvider::new(&server.url(), Duration::from_secs(5));

        let details = provider.fetch("com.example.nopolicy").await.unwrap();
        assert!(details.privacy_policy_url.is_none());
        assert!(details.permissions.is_empty());

        server.stop();
    }

    #[tokio::test]
    async fn test_unknown_app_is_not_found() {
        let mut server = MockMetadataServer::start().await;
        let provider = HttpMetadataProvider::new(&server.url(), Duration::from_secs(5));

        let err = provider.fetch("com.example.missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        server.stop();
    }

    #[tokio::test]
    async fn test_permissions_endpoint() {
        let mut server = MockMetadataServer::start().await;
        let provider = HttpMetadataProvider::new(&server.url(), Duration::from_secs(5));

        let perms = provider
            .fetch_permissions_only("com.example.nopolicy")
            .await
            .unwrap();
        assert_eq!(perms, vec![Permission::new("CAMERA", Some("dangerous"))]);

        assert!(provider.health_check().await);
        server.stop();
    }

    #[tokio::test]
    async fn test_unreachable_host_is_unhealthy() {
        let provider = HttpMetadataProvider::new("http://127.0.0.1:1", Duration::from_secs(1));
        assert!(!provider.health_check().await);
        assert!(provider.fetch("com.example.notes").await.is_err());
    }

    #[tokio::test]
    async fn test_app_id_is_one_path_segment() {
        let mut server = MockMetadataServer::start().await;
        let provider = HttpMetadataProvider::new(&server.url(), Duration::from_secs(5));

        for app_id in [
            "com.example.notes#frag",
            "com.example.notes?lang=en",
            "com.example.notes/permissions",
            "../apps/com.example.notes",
        ] {
            let err = provider.fetch(app_id).await.unwrap_err();
            assert!(matches!(err, Error::NotFound(_)), "{} resolved to {:?}", app_id, err);
        }
        assert!(provider
            .fetch_permissions_only("com.example.nopolicy#x")
            .await
            .is_err());

        server.stop();
    }

    #[tokio::test]
    async fn test_dot_segment_ids_are_rejected() {
        let mut server = MockMetadataServer::start().await;
        let provider = HttpMetadataProvider::new(&server.url(), Duration::from_secs(5));

        for app_id in ["", ".", ".."] {
            let err = provider.fetch_permissions_only(app_id).await.unwrap_err();
            assert!(matches!(err, Error::Metadata(_)));
        }

        server.stop();
    }

    #[test]
    fn test_endpoint_keeps_host_prefix() {
        let provider =
            HttpMetadataProvider::new("http://127.0.0.1:3100/store/", Duration::from_secs(5));
        let url = provider.endpoint(&["apps", "a b#c"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:3100/store/apps/a%20b%23c");
    }
}
