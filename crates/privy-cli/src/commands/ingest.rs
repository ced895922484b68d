//! Ingestion command implementations (ingest, extract, details)

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use privy_core::{
    Extraction, IngestionPipeline, MetadataClient, MetadataProvider, Outcome, PolicyTextExtractor,
};
use tokio::task::JoinSet;
use tracing::warn;

use super::truncate;

/// Characters of policy text shown by `extract` without --full
const PREVIEW_CHARS: usize = 500;

/// Per-outcome counts for an ingest batch
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub counts: BTreeMap<&'static str, usize>,
    pub failed: usize,
}

impl IngestSummary {
    pub fn count(&self, kind: &str) -> usize {
        self.counts.get(kind).copied().unwrap_or(0)
    }
}

/// Collect app identifiers from arguments and an optional file
///
/// Blank lines and `#` comments are skipped; duplicates keep their first position.
pub fn read_app_ids(args: &[String], file: Option<&Path>) -> Result<Vec<String>> {
    let mut raw: Vec<String> = args.to_vec();

    if let Some(path) = file {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        raw.extend(content.lines().map(str::to_string));
    }

    let mut seen = HashSet::new();
    let ids: Vec<String> = raw
        .iter()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        anyhow::bail!("No app identifiers given (pass them as arguments or with --file)");
    }
    Ok(ids)
}

fn spawn_ingest(
    tasks: &mut JoinSet<(String, Outcome)>,
    pipeline: &IngestionPipeline,
    app_id: String,
) {
    let pipeline = pipeline.clone();
    tasks.spawn(async move {
        let outcome = pipeline.process(&app_id).await;
        (app_id, outcome)
    });
}

pub async fn cmd_ingest(
    pipeline: &IngestionPipeline,
    app_ids: Vec<String>,
    concurrency: usize,
) -> Result<IngestSummary> {
    let total = app_ids.len();
    let concurrency = concurrency.max(1);
    println!("📥 Ingesting {} app(s), {} at a time...", total, concurrency);

    let mut queue = app_ids.into_iter();
    let mut tasks = JoinSet::new();
    let mut summary = IngestSummary::default();

    for app_id in queue.by_ref().take(concurrency) {
        spawn_ingest(&mut tasks, pipeline, app_id);
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((app_id, outcome)) => {
                let icon = match outcome.kind() {
                    "saved" | "reprocessed" => "✅",
                    "already_present" | "skipped_reviewed" => "⏭️ ",
                    "sensitive_diverted" => "🔒",
                    "flagged_for_review" => "📝",
                    _ => "❌",
                };
                println!("   {} {}", icon, outcome.message(&app_id));

                if outcome.is_failure() {
                    summary.failed += 1;
                }
                *summary.counts.entry(outcome.kind()).or_insert(0) += 1;
            }
            Err(e) => {
                warn!(error = %e, "Ingestion task panicked");
                summary.failed += 1;
            }
        }

        if let Some(app_id) = queue.next() {
            spawn_ingest(&mut tasks, pipeline, app_id);
        }
    }

    println!();
    println!("📊 Ingestion Results");
    println!("   ─────────────────────────────");
    for (kind, count) in &summary.counts {
        println!("   {:<20} {}", kind, count);
    }

    Ok(summary)
}

pub async fn cmd_extract(extractor: &PolicyTextExtractor, url: &str, full: bool) -> Result<()> {
    println!("🌐 Extracting policy text from {}...", url);

    match extractor.extract(url).await {
        Extraction::Text(text) => {
            println!("   {} characters", text.chars().count());
            println!();
            if full {
                println!("{}", text);
            } else {
                println!("{}", truncate(&text, PREVIEW_CHARS));
            }
            Ok(())
        }
        Extraction::NotFound => anyhow::bail!("{}", Extraction::NotFound.as_str()),
        Extraction::Error(e) => anyhow::bail!("{} ({})", privy_core::EXTRACTION_ERROR, e),
    }
}

pub async fn cmd_details(metadata: &MetadataClient, app_id: &str) -> Result<()> {
    let details = metadata
        .fetch(app_id)
        .await
        .with_context(|| format!("Failed to fetch metadata for {}", app_id))?;

    println!("{}", serde_json::to_string_pretty(&details)?);
    Ok(())
}
