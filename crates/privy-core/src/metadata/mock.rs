//! Mock metadata provider for testing
//!
//! Serves canned app records. Clones share state, so a test can keep one
//! handle for assertions and give another to the pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{AppDetails, Permission};

use super::MetadataProvider;

#[derive(Default)]
struct MockState {
    apps: RwLock<HashMap<String, AppDetails>>,
    permissions: RwLock<HashMap<String, Vec<Permission>>>,
    failures: RwLock<HashMap<String, String>>,
    fetch_calls: AtomicUsize,
    permission_calls: AtomicUsize,
}

/// Mock metadata provider
#[derive(Clone, Default)]
pub struct MockMetadataProvider {
    state: Arc<MockState>,
    /// Whether health_check should return true
    pub healthy: bool,
}

impl MockMetadataProvider {
    /// Create an empty, healthy provider
    pub fn new() -> Self {
        Self {
            state: Arc::default(),
            healthy: true,
        }
    }

    /// Add or replace an app record
    pub fn with_app(self, details: AppDetails) -> Self {
        if let Ok(mut apps) = self.state.apps.write() {
            apps.insert(details.app_id.clone(), details);
        }
        self
    }

    /// Set what the permissions-only lookup returns for an app
    pub fn with_permissions(self, app_id: &str, permissions: Vec<Permission>) -> Self {
        if let Ok(mut perms) = self.state.permissions.write() {
            perms.insert(app_id.to_string(), permissions);
        }
        self
    }

    /// Make every lookup for an app fail with the given message
    pub fn with_failure(self, app_id: &str, message: &str) -> Self {
        if let Ok(mut failures) = self.state.failures.write() {
            failures.insert(app_id.to_string(), message.to_string());
        }
        self
    }

    /// Number of `fetch` calls so far
    pub fn fetch_calls(&self) -> usize {
        self.state.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_permissions_only` calls so far
    pub fn permission_calls(&self) -> usize {
        self.state.permission_calls.load(Ordering::SeqCst)
    }

    fn check_failure(&self, app_id: &str) -> Result<()> {
        let failures = self
            .state
            .failures
            .read()
            .map_err(|_| Error::Metadata("mock state poisoned".to_string()))?;
        match failures.get(app_id) {
            Some(message) => Err(Error::Metadata(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl MetadataProvider for MockMetadataProvider {
    async fn fetch(&self, app_id: &str) -> Result<AppDetails> {
        self.state.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(app_id)?;

        let apps = self
            .state
            .apps
            .read()
            .map_err(|_| Error::Metadata("mock state poisoned".to_string()))?;
        apps.get(app_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("app {} not found in store", app_id)))
    }

    async fn fetch_permissions_only(&self, app_id: &str) -> Result<Vec<Permission>> {
        self.state.permission_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(app_id)?;

        let perms = self
            .state
            .permissions
            .read()
            .map_err(|_| Error::Metadata("mock state poisoned".to_string()))?;
        Ok(perms.get(app_id).cloned().unwrap_or_default())
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn host(&self) -> &str {
        "mock"
    }
}
