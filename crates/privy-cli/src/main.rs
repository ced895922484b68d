//! Privy CLI - Privacy-policy ingestion for mobile apps
//!
//! Usage:
//!   privy init                        Initialize database
//!   privy ingest com.example.app      Fetch, extract and store a policy
//!   privy review list                 Show the manual review queue
//!   privy serve --port 5001           Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Ingest {
            app_ids,
            file,
            concurrency,
        } => {
            let ids = commands::read_app_ids(&app_ids, file.as_deref())?;
            let config = commands::load_config(cli.config.as_deref())?;
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            let pipeline = commands::build_pipeline(db, &config)?;
            let summary = commands::cmd_ingest(&pipeline, ids, concurrency).await?;
            if summary.failed > 0 {
                anyhow::bail!("{} app(s) failed with store errors", summary.failed);
            }
            Ok(())
        }
        Commands::Extract { url, full } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let extractor = privy_core::PolicyTextExtractor::chrome(&config.extraction);
            commands::cmd_extract(&extractor, &url, full).await
        }
        Commands::Details { app_id } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let metadata = commands::metadata_client(&config)?;
            commands::cmd_details(&metadata, &app_id).await
        }
        Commands::Apps { show } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match show {
                Some(app_id) => commands::cmd_apps_show(&db, &app_id),
                None => commands::cmd_apps_list(&db),
            }
        }
        Commands::Review { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None => commands::cmd_review_list(&db, Some("pending")),
                Some(ReviewAction::List { status }) => {
                    commands::cmd_review_list(&db, status.as_deref())
                }
                Some(ReviewAction::Resolve { app_id, note }) => {
                    commands::cmd_review_resolve(&db, &app_id, note.as_deref())
                }
            }
        }
        Commands::Sensitive => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_sensitive(&db)
        }
        Commands::Runs { limit, app } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_runs(&db, limit, app.as_deref())
        }
        Commands::Status => {
            commands::cmd_status(&cli.db, cli.no_encrypt, cli.config.as_deref()).await
        }
        Commands::Serve {
            port,
            host,
            allowed_origins,
        } => {
            commands::cmd_serve(
                &cli.db,
                cli.no_encrypt,
                cli.config.as_deref(),
                &host,
                port,
                allowed_origins,
            )
            .await
        }
    }
}
