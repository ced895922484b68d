//! Sensitive app registrations

use rusqlite::params;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::SensitiveAppEntry;

impl Database {
    /// Check whether an app is registered as sensitive
    pub fn has_sensitive_entry(&self, app_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sensitive_apps WHERE app_id = ?)",
            params![app_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Register an app as sensitive, ignoring duplicates
    ///
    /// Returns true if a new row was written.
    pub fn insert_sensitive_app(&self, app_id: &str, app_name: &str, category: &str) -> Result<bool> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "INSERT OR IGNORE INTO sensitive_apps (app_id, app_name, category) VALUES (?, ?, ?)",
            params![app_id, app_name, category],
        )?;
        Ok(changed > 0)
    }

    /// List sensitive apps, newest first
    pub fn list_sensitive_apps(&self) -> Result<Vec<SensitiveAppEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT app_id, app_name, category, date_added FROM sensitive_apps \
             ORDER BY date_added DESC, app_id",
        )?;

        let apps = stmt
            .query_map([], |row| {
                let date_added: String = row.get(3)?;
                Ok(SensitiveAppEntry {
                    app_id: row.get(0)?,
                    app_name: row.get(1)?,
                    category: row.get(2)?,
                    date_added: parse_datetime(&date_added),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(apps)
    }
}
