//! Catalog command implementations (apps, sensitive)

use anyhow::Result;
use privy_core::db::Database;

use super::truncate;

pub fn cmd_apps_list(db: &Database) -> Result<()> {
    let apps = db.list_app_summaries()?;

    if apps.is_empty() {
        println!("No policies saved yet. Run 'privy ingest <app_id>' first.");
        return Ok(());
    }

    println!();
    println!("📚 Saved Policies ({})", apps.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for app in &apps {
        let rating = app
            .rating
            .map(|r| format!("{:.1}", r))
            .unwrap_or_else(|| "unrated".to_string());
        println!(
            "   {:<40} {:<30} {}",
            truncate(&app.app_id, 40),
            truncate(&app.app_name, 30),
            rating
        );
    }
    println!();
    Ok(())
}

pub fn cmd_apps_show(db: &Database, app_id: &str) -> Result<()> {
    let Some(app) = db.get_policy_with_icon(app_id)? else {
        anyhow::bail!("No saved policy for {}", app_id);
    };
    let policy = &app.policy;

    println!();
    println!("📄 {} ({})", policy.app_name, policy.app_id);
    println!("   ─────────────────────────────────────────────────────────────");
    println!("   Category:    {}", policy.category);
    println!("   Policy URL:  {}", policy.policy_url);
    if let Some(icon) = &app.icon_url {
        println!("   Icon:        {}", icon);
    }
    println!("   Permissions: {}", policy.permissions);
    println!(
        "   Updated:     {}",
        policy.date_updated.format("%Y-%m-%d %H:%M")
    );
    println!("   Policy text: {} characters", policy.policy_text.chars().count());
    println!();
    println!("{}", truncate(&policy.policy_text, 800));
    println!();
    Ok(())
}

pub fn cmd_sensitive(db: &Database) -> Result<()> {
    let apps = db.list_sensitive_apps()?;

    if apps.is_empty() {
        println!("No sensitive apps registered.");
        return Ok(());
    }

    println!();
    println!("🔒 Sensitive Apps ({})", apps.len());
    println!("   ─────────────────────────────────────────────────────────────");
    for app in &apps {
        println!(
            "   {:<40} {:<30} {}",
            truncate(&app.app_id, 40),
            truncate(&app.app_name, 30),
            app.category
        );
    }
    println!();
    Ok(())
}
