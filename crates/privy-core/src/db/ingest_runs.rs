//! Ingestion run log and store statistics

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{IngestRun, StoreStats};

impl Database {
    /// Record one pipeline invocation
    pub fn log_ingest_run(&self, app_id: &str, outcome: &str, message: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO ingest_runs (app_id, outcome, message) VALUES (?, ?, ?)",
            params![app_id, outcome, message],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// List recent runs, newest first, optionally for one app
    pub fn list_ingest_runs(&self, app_id: Option<&str>, limit: i64) -> Result<Vec<IngestRun>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, app_id, outcome, message, created_at
            FROM ingest_runs
            WHERE (?1 IS NULL OR app_id = ?1)
            ORDER BY id DESC
            LIMIT ?2
            "#,
        )?;

        let runs = stmt
            .query_map(params![app_id, limit], |row| {
                let created_at: String = row.get(4)?;
                Ok(IngestRun {
                    id: row.get(0)?,
                    app_id: row.get(1)?,
                    outcome: row.get(2)?,
                    message: row.get(3)?,
                    created_at: parse_datetime(&created_at),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(runs)
    }

    /// Row counts across the ingestion tables
    pub fn store_stats(&self) -> Result<StoreStats> {
        let conn = self.conn()?;
        let stats = conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM policies),
                (SELECT COUNT(*) FROM app_icons),
                (SELECT COUNT(*) FROM sensitive_apps),
                (SELECT COUNT(*) FROM manual_review WHERE status = 'pending'),
                (SELECT COUNT(*) FROM manual_review WHERE status = 'reviewed'),
                (SELECT COUNT(*) FROM ingest_runs)
            "#,
            [],
            |row| {
                Ok(StoreStats {
                    policies: row.get(0)?,
                    icons: row.get(1)?,
                    sensitive_apps: row.get(2)?,
                    pending_review: row.get(3)?,
                    reviewed: row.get(4)?,
                    ingest_runs: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }
}
