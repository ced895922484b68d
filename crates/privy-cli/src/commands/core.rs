//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` / `metadata_client` / `build_pipeline` - Ingestion wiring
//! - `cmd_init` - Initialize the database

use std::path::Path;

use anyhow::{Context, Result};
use privy_core::config::METADATA_HOST_ENV;
use privy_core::{db::Database, IngestConfig, IngestionPipeline, MetadataClient};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .with_context(|| format!("Database path is not valid UTF-8: {}", db_path.display()))?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load ingestion config (explicit path, user override, or built-in defaults)
pub fn load_config(config_path: Option<&Path>) -> Result<IngestConfig> {
    IngestConfig::load(config_path).context("Failed to load ingestion config")
}

/// Metadata client from config, or an error naming the setting to fix
pub fn metadata_client(config: &IngestConfig) -> Result<MetadataClient> {
    MetadataClient::from_config(&config.metadata).with_context(|| {
        format!(
            "No metadata provider configured: set {} or [metadata] host",
            METADATA_HOST_ENV
        )
    })
}

/// Pipeline with the configured metadata provider and headless Chrome
pub fn build_pipeline(db: Database, config: &IngestConfig) -> Result<IngestionPipeline> {
    let metadata = metadata_client(config)?;
    Ok(IngestionPipeline::from_config(db, metadata, config))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let stats = db.store_stats().context("Failed to read database")?;
    println!("   Tables ready ({} policies stored)", stats.policies);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Point at a metadata sidecar: export {}=http://127.0.0.1:3100", METADATA_HOST_ENV);
    println!("  2. Ingest an app: privy ingest com.example.app");
    println!("  3. Start web UI: privy serve");

    Ok(())
}
