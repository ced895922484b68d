//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod apps;
pub mod ingest;
pub mod review;
pub mod runs;

// Re-export all handlers for use in router
pub use apps::*;
pub use ingest::*;
pub use review::*;
pub use runs::*;
