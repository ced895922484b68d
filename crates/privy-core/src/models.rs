//! Domain models for Privy

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stored in `policies.permissions` when an app declares no permissions
pub const NO_PERMISSIONS: &str = "None";

/// Rendered when a permission carries no type tag
const UNKNOWN_PERMISSION_TYPE: &str = "Unknown";

/// A single permission declared by an app
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: String,
    /// Protection level or group reported by the store ("dangerous", "normal", ...)
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Permission {
    pub fn new(name: &str, kind: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            kind: kind.map(str::to_string),
        }
    }

    /// Human-readable form: `CAMERA (dangerous)`
    pub fn label(&self) -> String {
        format!(
            "{} ({})",
            self.name,
            self.kind.as_deref().unwrap_or(UNKNOWN_PERMISSION_TYPE)
        )
    }
}

/// Format a permission list for the `permissions` display column
///
/// Entries are joined with `"; "`; an empty list becomes [`NO_PERMISSIONS`].
pub fn format_permissions(permissions: &[Permission]) -> String {
    if permissions.is_empty() {
        return NO_PERMISSIONS.to_string();
    }
    permissions
        .iter()
        .map(Permission::label)
        .collect::<Vec<_>>()
        .join("; ")
}

/// App metadata as returned by a metadata provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDetails {
    pub app_id: String,
    pub title: String,
    /// Privacy policy URL listed on the store page, if any
    pub privacy_policy_url: Option<String>,
    /// Store taxonomy label ("Finance", "Medical", "Tools", ...)
    pub category: String,
    pub icon_url: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

/// A saved privacy policy (row in `policies`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub app_id: String,
    pub app_name: String,
    pub policy_url: String,
    pub policy_text: String,
    /// Display form of the permission list (see [`format_permissions`])
    pub permissions: String,
    /// Structured permission list, stored as JSON
    pub permission_list: Vec<Permission>,
    /// Filled in later by the rating process
    pub rating: Option<f64>,
    pub privacy_concern: String,
    pub worst_permissions: String,
    pub category: String,
    pub user_feedback: String,
    pub date_updated: DateTime<Utc>,
}

impl PolicyEntry {
    /// Build a fresh, unrated entry from provider metadata and extracted text
    pub fn unrated(
        details: &AppDetails,
        policy_url: &str,
        policy_text: String,
        permission_list: Vec<Permission>,
    ) -> Self {
        Self {
            app_id: details.app_id.clone(),
            app_name: details.title.clone(),
            policy_url: policy_url.to_string(),
            policy_text,
            permissions: format_permissions(&permission_list),
            permission_list,
            rating: None,
            privacy_concern: String::new(),
            worst_permissions: String::new(),
            category: details.category.clone(),
            user_feedback: String::new(),
            date_updated: Utc::now(),
        }
    }
}

/// Icon for an app (row in `app_icons`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconEntry {
    pub app_id: String,
    pub icon_url: Option<String>,
}

/// An app diverted from automated analysis because of its category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitiveAppEntry {
    pub app_id: String,
    pub app_name: String,
    pub category: String,
    pub date_added: DateTime<Utc>,
}

/// Manual review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    /// Awaiting a retry or a human
    Pending,
    /// Dispositioned; the pipeline will not touch it again
    Reviewed,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
        }
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "reviewed" => Ok(Self::Reviewed),
            _ => Err(format!("Unknown review status: {}", s)),
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row in the manual review queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualReviewEntry {
    pub app_id: String,
    pub app_name: String,
    pub policy_url: Option<String>,
    pub permissions: String,
    pub category: Option<String>,
    pub reason: String,
    pub status: ReviewStatus,
    pub date_added: DateTime<Utc>,
}

/// Values written when flagging an app for manual review
#[derive(Debug, Clone)]
pub struct NewManualReview {
    pub app_id: String,
    pub app_name: String,
    pub policy_url: Option<String>,
    pub permissions: String,
    pub category: Option<String>,
    pub reason: String,
    pub status: ReviewStatus,
}

/// Listing row for the app catalog (policy joined with its icon)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSummary {
    pub app_id: String,
    pub app_name: String,
    pub rating: Option<f64>,
    pub worst_permissions: String,
    pub privacy_concern: String,
    pub icon_url: Option<String>,
}

/// Full policy row plus its icon, as served to the app details screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyWithIcon {
    #[serde(flatten)]
    pub policy: PolicyEntry,
    pub icon_url: Option<String>,
}

/// One logged `process()` invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRun {
    pub id: i64,
    pub app_id: String,
    pub outcome: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Row counts across the ingestion tables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    pub policies: i64,
    pub icons: i64,
    pub sensitive_apps: i64,
    pub pending_review: i64,
    pub reviewed: i64,
    pub ingest_runs: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_label_defaults_type() {
        assert_eq!(
            Permission::new("CAMERA", Some("dangerous")).label(),
            "CAMERA (dangerous)"
        );
        assert_eq!(Permission::new("INTERNET", None).label(), "INTERNET (Unknown)");
    }

    #[test]
    fn test_format_permissions() {
        assert_eq!(format_permissions(&[]), "None");

        let perms = vec![
            Permission::new("CAMERA", Some("dangerous")),
            Permission::new("INTERNET", Some("normal")),
        ];
        assert_eq!(
            format_permissions(&perms),
            "CAMERA (dangerous); INTERNET (normal)"
        );
    }

    #[test]
    fn test_permission_json_shape() {
        let json = serde_json::to_string(&Permission::new("CAMERA", Some("dangerous"))).unwrap();
        assert_eq!(json, r#"{"name":"CAMERA","type":"dangerous"}"#);

        let parsed: Permission = serde_json::from_str(r#"{"name":"INTERNET"}"#).unwrap();
        assert_eq!(parsed.kind, None);
    }

    #[test]
    fn test_review_status_round_trip() {
        assert_eq!("PENDING".parse::<ReviewStatus>(), Ok(ReviewStatus::Pending));
        assert_eq!(ReviewStatus::Reviewed.to_string(), "reviewed");
        assert!("closed".parse::<ReviewStatus>().is_err());
    }
}
