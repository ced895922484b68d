//! Server command implementation

use std::path::Path;

use anyhow::Result;
use privy_core::IngestionPipeline;
use privy_server::ServerConfig;

use super::{load_config, open_db};

pub async fn cmd_serve(
    db_path: &Path,
    no_encrypt: bool,
    config_path: Option<&Path>,
    host: &str,
    port: u16,
    allowed_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Privy web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if !allowed_origins.is_empty() {
        println!("   CORS origins: {}", allowed_origins.join(", "));
    }

    let config = load_config(config_path)?;
    let db = open_db(db_path, no_encrypt)?;

    let pipeline = privy_core::MetadataClient::from_config(&config.metadata)
        .map(|metadata| IngestionPipeline::from_config(db.clone(), metadata, &config));
    if pipeline.is_none() {
        println!("   ⚠️  Ingestion disabled: no metadata provider configured");
    }

    privy_server::serve_with_config(
        db,
        pipeline,
        host,
        port,
        ServerConfig { allowed_origins },
    )
    .await
}
