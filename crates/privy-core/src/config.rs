//! Ingestion configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for an override file (explicit path, or
//!    ~/.local/share/privy/config/ingest.toml)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! `PRIVY_METADATA_HOST` overrides `[metadata] host` after the file is read.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/ingest.toml");

/// Environment variable for the metadata sidecar URL
pub const METADATA_HOST_ENV: &str = "PRIVY_METADATA_HOST";

/// Category triage settings
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Store categories whose apps are diverted from policy analysis
    pub sensitive_categories: Vec<String>,
}

impl TriageConfig {
    /// Whether a store category is in the sensitive set (case-insensitive)
    pub fn is_sensitive(&self, category: &str) -> bool {
        let category = category.trim();
        self.sensitive_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            sensitive_categories: vec!["Finance".to_string(), "Medical".to_string()],
        }
    }
}

/// Policy page extraction settings
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Minimum non-whitespace characters for text to count as a policy
    pub min_text_chars: usize,
    pub navigation_timeout: Duration,
    /// Delay between the simulated copy and reading the clipboard
    pub clipboard_settle: Duration,
    pub headless: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 50,
            navigation_timeout: Duration::from_secs(60),
            clipboard_settle: Duration::from_millis(1000),
            headless: true,
        }
    }
}

/// Metadata provider settings
#[derive(Debug, Clone)]
pub struct MetadataConfig {
    /// Base URL of the store-metadata sidecar
    pub host: Option<String>,
    pub timeout: Duration,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Complete ingestion configuration
#[derive(Debug, Clone, Default)]
pub struct IngestConfig {
    pub triage: TriageConfig,
    pub extraction: ExtractionConfig,
    pub metadata: MetadataConfig,
}

impl IngestConfig {
    /// Load configuration (override first, then embedded default), then apply env
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        let mut config = load_config(override_path)?;
        if let Ok(host) = std::env::var(METADATA_HOST_ENV) {
            if !host.trim().is_empty() {
                config.metadata.host = Some(host.trim().to_string());
            }
        }
        Ok(config)
    }

    /// Parse configuration from TOML content (no env overrides)
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("privy").join("config").join("ingest.toml"))
}

fn load_config(override_path: Option<&Path>) -> Result<IngestConfig> {
    let path = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let content = match path {
        Some(ref p) if p.exists() => fs::read_to_string(p)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", p.display(), e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    triage: Option<RawTriage>,
    extraction: Option<RawExtraction>,
    metadata: Option<RawMetadata>,
}

#[derive(Debug, Deserialize)]
struct RawTriage {
    sensitive_categories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawExtraction {
    min_text_chars: Option<usize>,
    navigation_timeout_secs: Option<u64>,
    clipboard_settle_ms: Option<u64>,
    headless: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawMetadata {
    host: Option<String>,
    timeout_secs: Option<u64>,
}

fn parse_config(content: &str) -> Result<IngestConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = IngestConfig::default();

    if let Some(triage) = raw.triage {
        if let Some(categories) = triage.sensitive_categories {
            config.triage.sensitive_categories = categories
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
    }

    if let Some(extraction) = raw.extraction {
        if let Some(min) = extraction.min_text_chars {
            config.extraction.min_text_chars = min;
        }
        if let Some(secs) = extraction.navigation_timeout_secs {
            config.extraction.navigation_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = extraction.clipboard_settle_ms {
            config.extraction.clipboard_settle = Duration::from_millis(ms);
        }
        if let Some(headless) = extraction.headless {
            config.extraction.headless = headless;
        }
    }

    if let Some(metadata) = raw.metadata {
        config.metadata.host = metadata
            .host
            .map(|h| h.trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty());
        if let Some(secs) = metadata.timeout_secs {
            config.metadata.timeout = Duration::from_secs(secs);
        }
    }

    Ok(config)
}
