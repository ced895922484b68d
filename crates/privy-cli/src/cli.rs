//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Privy - Collect app privacy policies for analysis
#[derive(Parser)]
#[command(name = "privy")]
#[command(about = "Privacy-policy ingestion for mobile apps", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "privy.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set PRIVY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Ingestion config file (defaults to ~/.local/share/privy/config/ingest.toml,
    /// then the built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Ingest privacy policies for one or more apps
    ///
    /// Requires PRIVY_METADATA_HOST (or [metadata] host in the config).
    Ingest {
        /// App identifiers (e.g. com.example.app)
        app_ids: Vec<String>,

        /// File with one app identifier per line (# starts a comment)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Number of apps processed at once
        #[arg(short, long, default_value = "4")]
        concurrency: usize,
    },

    /// Extract policy text from a URL without saving it
    Extract {
        /// Privacy policy URL
        url: String,

        /// Print the full text instead of a preview
        #[arg(long)]
        full: bool,
    },

    /// Show store metadata for an app
    Details {
        /// App identifier
        app_id: String,
    },

    /// List saved policies
    Apps {
        /// Show the full record for one app
        #[arg(long)]
        show: Option<String>,
    },

    /// Manual review queue (list, resolve)
    Review {
        #[command(subcommand)]
        action: Option<ReviewAction>,
    },

    /// List apps diverted as sensitive
    Sensitive,

    /// Show recent ingestion runs
    Runs {
        /// Maximum runs to show
        #[arg(short, long, default_value = "20")]
        limit: i64,

        /// Only runs for this app
        #[arg(long)]
        app: Option<String>,
    },

    /// Show database and provider status
    Status,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "5001")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Allowed CORS origin (repeatable)
        #[arg(long = "allow-origin")]
        allowed_origins: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum ReviewAction {
    /// List queued apps
    List {
        /// Filter by status: pending, reviewed
        #[arg(short, long)]
        status: Option<String>,
    },

    /// Mark a queued app as reviewed
    Resolve {
        /// App identifier
        app_id: String,

        /// Replace the recorded reason with this note
        #[arg(long)]
        note: Option<String>,
    },
}
