//! Manual review command implementations

use anyhow::Result;
use privy_core::db::Database;
use privy_core::models::ReviewStatus;

use super::truncate;

pub fn cmd_review_list(db: &Database, status: Option<&str>) -> Result<()> {
    let status = match status {
        None | Some("all") => None,
        Some(s) => Some(s.parse::<ReviewStatus>().map_err(|e| anyhow::anyhow!(e))?),
    };

    let entries = db.list_manual_review(status)?;

    if entries.is_empty() {
        println!("Manual review queue is empty.");
        return Ok(());
    }

    println!();
    println!("📝 Manual Review ({})", entries.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for entry in &entries {
        println!(
            "   [{:<8}] {:<40} {}",
            entry.status.as_str(),
            truncate(&entry.app_id, 40),
            entry.reason
        );
        if let Some(url) = &entry.policy_url {
            println!("              {}", url);
        }
    }
    println!();
    Ok(())
}

pub fn cmd_review_resolve(db: &Database, app_id: &str, note: Option<&str>) -> Result<()> {
    if !db.resolve_manual_review(app_id, note)? {
        anyhow::bail!("{} is not in the manual review queue", app_id);
    }
    println!("✅ Marked {} as reviewed", app_id);
    Ok(())
}
