//! Database access layer with connection pooling and migrations
//!
//! This module is organized by table:
//! - `policies` - Saved privacy policies and their icons
//! - `sensitive` - Apps diverted because of a sensitive store category
//! - `manual_review` - Human triage queue
//! - `ingest_runs` - Per-invocation pipeline log and store statistics
//!
//! Every ingestion table is keyed by the application identifier. Unique keys
//! are what make concurrent pipelines for the same identifier safe; no
//! external locking is used.

use std::time::Duration;

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod ingest_runs;
mod manual_review;
mod policies;
mod sensitive;

pub use policies::PolicyInsertResult;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "PRIVY_DB_KEY";

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"privy-salt-v1-fx";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc)))
        .unwrap_or_else(|_| Utc::now())
}

/// Format a timestamp the way SQLite's `datetime('now')` does
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Database wrapper with connection pooling
///
/// Cheap to clone; clones share the pool. The handle is created by the
/// process bootstrap and injected into the pipeline.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `PRIVY_DB_KEY` environment variable to be set.
    /// Returns an error if it is not set. Use `new_unencrypted()`
    /// for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let key_pragma = match passphrase {
            Some(pass) => Some(format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?)),
            None => None,
        };

        // Key must be the first statement on every new connection
        let manager = SqliteConnectionManager::file(path).with_init(move |conn| {
            if let Some(ref pragma) = key_pragma {
                conn.execute_batch(pragma)?;
            }
            conn.busy_timeout(BUSY_TIMEOUT)?;
            Ok(())
        });

        let pool = Pool::builder().max_size(10).build(manager)?;

        let db = Self { pool };
        db.run_migrations()?;

        Ok(db)
    }

    /// Create a throwaway database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because every pooled
    /// connection would otherwise see its own empty database.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "privy_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- WAL mode: readers don't block the single writer
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Saved privacy policies (one row per app, written once)
            CREATE TABLE IF NOT EXISTS policies (
                app_id TEXT PRIMARY KEY,
                app_name TEXT NOT NULL,
                policy_url TEXT NOT NULL,
                policy_text TEXT NOT NULL,
                permissions TEXT NOT NULL DEFAULT 'None',   -- "NAME (type); NAME (type)"
                permissions_json TEXT NOT NULL DEFAULT '[]', -- [{"name": ..., "type": ...}]
                rating REAL,                                -- filled by the rating process
                privacy_concern TEXT NOT NULL DEFAULT '',
                worst_permissions TEXT NOT NULL DEFAULT '',
                category TEXT NOT NULL DEFAULT 'Unknown',
                user_feedback TEXT NOT NULL DEFAULT '',
                date_updated DATETIME NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_policies_category ON policies(category);

            -- Icons, written next to every saved policy
            CREATE TABLE IF NOT EXISTS app_icons (
                app_id TEXT PRIMARY KEY,
                icon_url TEXT
            );

            -- Apps excluded from automated analysis by category
            CREATE TABLE IF NOT EXISTS sensitive_apps (
                app_id TEXT PRIMARY KEY,
                app_name TEXT NOT NULL,
                category TEXT NOT NULL,
                date_added DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Human triage queue
            CREATE TABLE IF NOT EXISTS manual_review (
                app_id TEXT PRIMARY KEY,
                app_name TEXT NOT NULL,
                policy_url TEXT,
                permissions TEXT NOT NULL DEFAULT 'None',
                category TEXT,
                reason TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'reviewed')),
                date_added DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_manual_review_status ON manual_review(status, date_added);

            -- One row per pipeline invocation
            CREATE TABLE IF NOT EXISTS ingest_runs (
                id INTEGER PRIMARY KEY,
                app_id TEXT NOT NULL,
                outcome TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_ingest_runs_app ON ingest_runs(app_id);
            CREATE INDEX IF NOT EXISTS idx_ingest_runs_created ON ingest_runs(created_at);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }
}
