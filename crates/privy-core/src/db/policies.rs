//! Policy and icon operations

use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use super::{format_datetime, parse_datetime, Database};
use crate::error::Result;
use crate::models::{AppSummary, IconEntry, Permission, PolicyEntry, PolicyWithIcon};

/// Result of writing a policy row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyInsertResult {
    /// Row written
    Inserted,
    /// A row for this app already existed (possibly written by a concurrent run)
    AlreadyPresent,
}

const POLICY_COLUMNS: &str = "app_id, app_name, policy_url, policy_text, permissions, \
     permissions_json, rating, privacy_concern, worst_permissions, category, \
     user_feedback, date_updated";

fn policy_from_row(row: &Row<'_>) -> rusqlite::Result<PolicyEntry> {
    let permissions_json: String = row.get(5)?;
    let date_updated: String = row.get(11)?;

    Ok(PolicyEntry {
        app_id: row.get(0)?,
        app_name: row.get(1)?,
        policy_url: row.get(2)?,
        policy_text: row.get(3)?,
        permissions: row.get(4)?,
        permission_list: serde_json::from_str::<Vec<Permission>>(&permissions_json)
            .unwrap_or_default(),
        rating: row.get(6)?,
        privacy_concern: row.get(7)?,
        worst_permissions: row.get(8)?,
        category: row.get(9)?,
        user_feedback: row.get(10)?,
        date_updated: parse_datetime(&date_updated),
    })
}

impl Database {
    /// Check whether a policy has been saved for an app
    pub fn has_policy(&self, app_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM policies WHERE app_id = ?)",
            params![app_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert a policy row
    ///
    /// Never overwrites: if the app already has a row (for example because a
    /// concurrent run committed first), the primary key rejects the write and
    /// `AlreadyPresent` is returned.
    pub fn insert_policy(&self, policy: &PolicyEntry) -> Result<PolicyInsertResult> {
        let conn = self.conn()?;
        let permissions_json = serde_json::to_string(&policy.permission_list)?;

        let result = conn.execute(
            &format!(
                "INSERT INTO policies ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                POLICY_COLUMNS
            ),
            params![
                policy.app_id,
                policy.app_name,
                policy.policy_url,
                policy.policy_text,
                policy.permissions,
                permissions_json,
                policy.rating,
                policy.privacy_concern,
                policy.worst_permissions,
                policy.category,
                policy.user_feedback,
                format_datetime(&policy.date_updated),
            ],
        );

        match result {
            Ok(_) => Ok(PolicyInsertResult::Inserted),
            Err(e) => {
                let err = crate::error::Error::from(e);
                if err.is_unique_violation() {
                    debug!(app_id = %policy.app_id, "Policy row already present");
                    Ok(PolicyInsertResult::AlreadyPresent)
                } else {
                    Err(err)
                }
            }
        }
    }

    /// Get a saved policy by app ID
    pub fn get_policy(&self, app_id: &str) -> Result<Option<PolicyEntry>> {
        let conn = self.conn()?;
        let policy = conn
            .query_row(
                &format!("SELECT {} FROM policies WHERE app_id = ?", POLICY_COLUMNS),
                params![app_id],
                policy_from_row,
            )
            .optional()?;
        Ok(policy)
    }

    /// Get a saved policy together with its icon URL
    pub fn get_policy_with_icon(&self, app_id: &str) -> Result<Option<PolicyWithIcon>> {
        let Some(policy) = self.get_policy(app_id)? else {
            return Ok(None);
        };
        let icon_url = self.get_icon(app_id)?.and_then(|icon| icon.icon_url);
        Ok(Some(PolicyWithIcon { policy, icon_url }))
    }

    /// Insert or replace the icon for an app
    pub fn upsert_icon(&self, icon: &IconEntry) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO app_icons (app_id, icon_url) VALUES (?, ?)
            ON CONFLICT(app_id) DO UPDATE SET icon_url = excluded.icon_url
            "#,
            params![icon.app_id, icon.icon_url],
        )?;
        Ok(())
    }

    /// Get the icon for an app
    pub fn get_icon(&self, app_id: &str) -> Result<Option<IconEntry>> {
        let conn = self.conn()?;
        let icon = conn
            .query_row(
                "SELECT app_id, icon_url FROM app_icons WHERE app_id = ?",
                params![app_id],
                |row| {
                    Ok(IconEntry {
                        app_id: row.get(0)?,
                        icon_url: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(icon)
    }

    /// List every saved app with its icon, ordered by name
    pub fn list_app_summaries(&self) -> Result<Vec<AppSummary>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT p.app_id, p.app_name, p.rating, p.worst_permissions, p.privacy_concern, i.icon_url
            FROM policies p
            LEFT JOIN app_icons i ON i.app_id = p.app_id
            ORDER BY p.app_name COLLATE NOCASE
            "#,
        )?;

        let apps = stmt
            .query_map([], |row| {
                Ok(AppSummary {
                    app_id: row.get(0)?,
                    app_name: row.get(1)?,
                    rating: row.get(2)?,
                    worst_permissions: row.get(3)?,
                    privacy_concern: row.get(4)?,
                    icon_url: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(apps)
    }
}
