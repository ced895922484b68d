//! Status-related command implementations (status, runs)

use std::path::Path;

use anyhow::Result;
use privy_core::db::Database;
use privy_core::MetadataProvider;

use super::{load_config, metadata_client, open_db, truncate};

pub async fn cmd_status(db_path: &Path, no_encrypt: bool, config_path: Option<&Path>) -> Result<()> {
    use privy_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Privy Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Metadata provider
    match load_config(config_path).and_then(|c| metadata_client(&c)) {
        Ok(client) => {
            if client.health_check().await {
                println!("   ✅ Metadata provider: {}", client.host());
            } else {
                println!("   ⚠️  Metadata provider not responding: {}", client.host());
            }
        }
        Err(e) => println!("   ℹ️  {}", e),
    }

    // Try to open the database and show stats
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                if let Ok(stats) = db.store_stats() {
                    println!();
                    println!("   Policies: {}", stats.policies);
                    println!("   Icons: {}", stats.icons);
                    println!("   Sensitive apps: {}", stats.sensitive_apps);
                    println!(
                        "   Manual review: {} pending, {} reviewed",
                        stats.pending_review, stats.reviewed
                    );
                    println!("   Ingestion runs: {}", stats.ingest_runs);
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}

pub fn cmd_runs(db: &Database, limit: i64, app_id: Option<&str>) -> Result<()> {
    let runs = db.list_ingest_runs(app_id, limit.max(1))?;

    if runs.is_empty() {
        println!("No ingestion runs recorded.");
        return Ok(());
    }

    println!();
    println!("🕘 Recent Ingestion Runs");
    println!("   ─────────────────────────────────────────────────────────────");
    for run in &runs {
        println!(
            "   {}  {:<20} {}",
            run.created_at.format("%Y-%m-%d %H:%M:%S"),
            run.outcome,
            truncate(&run.message, 70)
        );
    }
    println!();
    Ok(())
}
