//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `apps` - Saved policy and sensitive app listings
//! - `core` - Init and shared utilities (open_db, load_config, build_pipeline)
//! - `ingest` - Ingestion, ad-hoc extraction, metadata lookup
//! - `review` - Manual review queue commands
//! - `serve` - Web server command
//! - `status` - Status and run log commands

pub mod apps;
pub mod core;
pub mod ingest;
pub mod review;
pub mod serve;
pub mod status;

// Re-export command functions for main.rs
pub use apps::*;
pub use core::*;
pub use ingest::*;
pub use review::*;
pub use serve::*;
pub use status::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
