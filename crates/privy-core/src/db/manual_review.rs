//! Manual review queue operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{ManualReviewEntry, NewManualReview, ReviewStatus};

fn review_from_row(row: &Row<'_>) -> rusqlite::Result<ManualReviewEntry> {
    let status_str: String = row.get(6)?;
    let date_added: String = row.get(7)?;

    Ok(ManualReviewEntry {
        app_id: row.get(0)?,
        app_name: row.get(1)?,
        policy_url: row.get(2)?,
        permissions: row.get(3)?,
        category: row.get(4)?,
        reason: row.get(5)?,
        status: status_str.parse().unwrap_or(ReviewStatus::Pending),
        date_added: parse_datetime(&date_added),
    })
}

impl Database {
    /// Get the manual review row for an app
    pub fn get_manual_review(&self, app_id: &str) -> Result<Option<ManualReviewEntry>> {
        let conn = self.conn()?;
        let entry = conn
            .query_row(
                r#"
                SELECT app_id, app_name, policy_url, permissions, category, reason, status, date_added
                FROM manual_review
                WHERE app_id = ?
                "#,
                params![app_id],
                review_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    /// Check whether an app is in the manual review queue (any status)
    pub fn has_manual_review(&self, app_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM manual_review WHERE app_id = ?)",
            params![app_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Flag an app for manual review
    ///
    /// One row per app: re-flagging overwrites every field, including the
    /// status, and resets `date_added`.
    pub fn upsert_manual_review(&self, review: &NewManualReview) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO manual_review (
                app_id, app_name, policy_url, permissions, category, reason, status, date_added
            ) VALUES (?, ?, ?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(app_id) DO UPDATE SET
                app_name = excluded.app_name,
                policy_url = excluded.policy_url,
                permissions = excluded.permissions,
                category = excluded.category,
                reason = excluded.reason,
                status = excluded.status,
                date_added = excluded.date_added
            "#,
            params![
                review.app_id,
                review.app_name,
                review.policy_url,
                review.permissions,
                review.category,
                review.reason,
                review.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// List the queue, optionally filtered by status, oldest first
    pub fn list_manual_review(&self, status: Option<ReviewStatus>) -> Result<Vec<ManualReviewEntry>> {
        let conn = self.conn()?;

        let mut sql = String::from(
            r#"
            SELECT app_id, app_name, policy_url, permissions, category, reason, status, date_added
            FROM manual_review
            "#,
        );
        if status.is_some() {
            sql.push_str(" WHERE status = ?");
        }
        sql.push_str(" ORDER BY date_added, app_id");

        let mut stmt = conn.prepare(&sql)?;
        let rows = match status {
            Some(s) => stmt.query_map(params![s.as_str()], review_from_row)?,
            None => stmt.query_map([], review_from_row)?,
        };

        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Mark a queued app as reviewed by a human
    ///
    /// Keeps the existing reason unless a note is given. Returns false when
    /// the app is not in the queue.
    pub fn resolve_manual_review(&self, app_id: &str, note: Option<&str>) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE manual_review SET status = 'reviewed', reason = COALESCE(?, reason) WHERE app_id = ?",
            params![note, app_id],
        )?;
        Ok(changed > 0)
    }
}
