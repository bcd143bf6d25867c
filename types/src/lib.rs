//! Shared types for RunLens
//!
//! This crate contains serializable record, distribution and configuration types
//! shared between the selection engine (runlens-core) and its frontends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ─────────────────────────────────────────────────────────────────────────────
// Records
// ─────────────────────────────────────────────────────────────────────────────

/// Stable unique identifier of a bot run record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Coarse outcome of a run, as delivered by the record feed (`status.type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Success,
    Error,
    Warning,
    Pending,
}

impl StatusKind {
    /// Returns true for the kinds that take part in category/subtype filtering
    pub fn is_issue(&self) -> bool {
        matches!(self, StatusKind::Error | StatusKind::Warning)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusKind::Success => "success",
            StatusKind::Error => "error",
            StatusKind::Warning => "warning",
            StatusKind::Pending => "pending",
        }
    }
}

/// Priority used when the feed does not carry one for an error or warning.
pub const UNKNOWN_PRIORITY: &str = "unknown";

/// Classification details of an error or warning run.
///
/// Every field is populated: absent feed values are replaced by fallbacks when
/// the status is decoded, so consumers never deal with optional access.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Issue {
    /// Category key (`status.value`)
    pub value: String,
    /// Free-form message; empty when the feed carries none
    pub message: String,
    /// Human-readable category label; falls back to the category key
    pub category: String,
    /// Priority label; falls back to [`UNKNOWN_PRIORITY`]
    pub priority: String,
}

/// Status of a run.
///
/// Success and pending runs carry no classification; error and warning runs
/// carry an [`Issue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawStatus", into = "RawStatus")]
pub enum RunStatus {
    Success { value: String, message: String },
    Pending { value: String, message: String },
    Error(Issue),
    Warning(Issue),
}

impl RunStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            RunStatus::Success { .. } => StatusKind::Success,
            RunStatus::Pending { .. } => StatusKind::Pending,
            RunStatus::Error(_) => StatusKind::Error,
            RunStatus::Warning(_) => StatusKind::Warning,
        }
    }

    /// The classification of an error or warning run, `None` otherwise
    pub fn issue(&self) -> Option<&Issue> {
        match self {
            RunStatus::Error(issue) | RunStatus::Warning(issue) => Some(issue),
            RunStatus::Success { .. } | RunStatus::Pending { .. } => None,
        }
    }

    pub fn value(&self) -> &str {
        match self {
            RunStatus::Success { value, .. } | RunStatus::Pending { value, .. } => value,
            RunStatus::Error(issue) | RunStatus::Warning(issue) => &issue.value,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            RunStatus::Success { message, .. } | RunStatus::Pending { message, .. } => message,
            RunStatus::Error(issue) | RunStatus::Warning(issue) => &issue.message,
        }
    }
}

/// Wire shape of a status object as the feed delivers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawStatus {
    #[serde(rename = "type")]
    kind: StatusKind,
    #[serde(default)]
    value: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    priority: Option<String>,
}

impl From<RawStatus> for RunStatus {
    fn from(raw: RawStatus) -> Self {
        let message = raw.message.unwrap_or_default();
        match raw.kind {
            StatusKind::Success => RunStatus::Success {
                value: raw.value,
                message,
            },
            StatusKind::Pending => RunStatus::Pending {
                value: raw.value,
                message,
            },
            kind => {
                let category = raw
                    .category
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| raw.value.clone());
                let priority = raw
                    .priority
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| UNKNOWN_PRIORITY.to_string());
                let issue = Issue {
                    value: raw.value,
                    message,
                    category,
                    priority,
                };
                if kind == StatusKind::Error {
                    RunStatus::Error(issue)
                } else {
                    RunStatus::Warning(issue)
                }
            }
        }
    }
}

impl From<RunStatus> for RawStatus {
    fn from(status: RunStatus) -> Self {
        let kind = status.kind();
        match status {
            RunStatus::Success { value, message } | RunStatus::Pending { value, message } => {
                RawStatus {
                    kind,
                    value,
                    message: Some(message),
                    category: None,
                    priority: None,
                }
            }
            RunStatus::Error(issue) | RunStatus::Warning(issue) => RawStatus {
                kind,
                value: issue.value,
                message: Some(issue.message),
                category: Some(issue.category),
                priority: Some(issue.priority),
            },
        }
    }
}

/// A single bot run as delivered by the record feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(alias = "_id")]
    pub id: RecordId,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Remaining domain attributes, passed through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Record {
    /// Build a record with no pass-through attributes
    pub fn new(id: impl Into<RecordId>, status: RunStatus) -> Self {
        Self {
            id: id.into(),
            status,
            platform: None,
            started_at: None,
            finished_at: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn issue(&self) -> Option<&Issue> {
        self.status.issue()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Distribution (view-ready aggregation output)
// ─────────────────────────────────────────────────────────────────────────────

/// Ordering of top-level distribution rows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "categories", rename_all = "snake_case")]
pub enum CategoryOrder {
    /// Order in which categories were first seen in the record feed
    #[default]
    Extraction,
    /// Case-insensitive by category key
    Alphabetical,
    /// Largest count first; ties keep extraction order
    CountDescending,
    /// Listed categories first, the rest in extraction order
    Explicit(Vec<String>),
}

impl CategoryOrder {
    /// Parse from user input. Anything that isn't a known keyword is read as a
    /// comma-separated explicit order.
    pub fn from_input(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "" | "extraction" => Self::Extraction,
            "alphabetical" | "alpha" => Self::Alphabetical,
            "count" => Self::CountDescending,
            _ => Self::Explicit(
                input
                    .split(',')
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect(),
            ),
        }
    }
}

/// What a distribution row describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowKind {
    Category { expandable: bool, expanded: bool },
    Subtype { parent: String, key: String },
}

/// One slice of the status distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRow {
    pub name: String,
    pub count: usize,
    /// Share of the in-scope error/warning records, 0-100
    pub percentage: f64,
    pub kind: RowKind,
    /// Member records, in feed order
    pub record_ids: Vec<RecordId>,
}

impl DistributionRow {
    pub fn is_subtype(&self) -> bool {
        matches!(self.kind, RowKind::Subtype { .. })
    }

    /// Parent category for subtype rows, own name for category rows
    pub fn category(&self) -> &str {
        match &self.kind {
            RowKind::Category { .. } => &self.name,
            RowKind::Subtype { parent, .. } => parent,
        }
    }
}

/// Ordered distribution plus the scope its percentages are relative to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub rows: Vec<DistributionRow>,
    /// Filtered error/warning records whose category is in the taxonomy
    pub total_in_scope: usize,
}

impl Distribution {
    /// Top-level rows only
    pub fn categories(&self) -> impl Iterator<Item = &DistributionRow> {
        self.rows.iter().filter(|r| !r.is_subtype())
    }

    pub fn subtypes_of<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a DistributionRow> {
        self.rows
            .iter()
            .filter(move |r| matches!(&r.kind, RowKind::Subtype { parent, .. } if parent == category))
    }

    pub fn row(&self, name: &str) -> Option<&DistributionRow> {
        self.rows.iter().find(|r| r.name == name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_hover_coalesce_ms() -> u64 {
    100
}

/// Categories left out of the default selection so first-time viewers only
/// see actionable failures.
pub fn default_excluded_categories() -> Vec<String> {
    ["no_new_data", "maintenance", "skipped", "rate_limited"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Application configuration, persisted as TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the persisted selection. Empty means the platform default.
    #[serde(default)]
    pub storage_directory: String,

    /// Categories excluded from "select default".
    #[serde(default = "default_excluded_categories")]
    pub default_excluded_categories: Vec<String>,

    /// Coalescing window for hover highlight callbacks.
    #[serde(default = "default_hover_coalesce_ms")]
    pub hover_coalesce_ms: u64,

    #[serde(default)]
    pub category_order: CategoryOrder,

    /// Follow selection changes made by other sessions.
    #[serde(default = "default_true")]
    pub watch_storage: bool,
}

impl AppConfig {
    /// Create a new AppConfig with the specified storage directory.
    /// Other fields use their default values.
    pub fn with_storage_directory(storage_directory: String) -> Self {
        Self {
            storage_directory,
            default_excluded_categories: default_excluded_categories(),
            hover_coalesce_ms: default_hover_coalesce_ms(),
            category_order: CategoryOrder::default(),
            watch_storage: true,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_storage_directory(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_status_fills_fallbacks() {
        let record: Record = serde_json::from_str(
            r#"{"id": "r1", "status": {"type": "error", "value": "login_failed"}}"#,
        )
        .unwrap();
        let issue = record.issue().unwrap();
        assert_eq!(issue.value, "login_failed");
        assert_eq!(issue.message, "");
        assert_eq!(issue.category, "login_failed");
        assert_eq!(issue.priority, UNKNOWN_PRIORITY);
    }

    #[test]
    fn success_status_has_no_issue() {
        let record: Record = serde_json::from_str(
            r#"{"id": "r2", "status": {"type": "success", "value": "ok", "message": null}}"#,
        )
        .unwrap();
        assert_eq!(record.status.kind(), StatusKind::Success);
        assert!(record.issue().is_none());
    }

    #[test]
    fn unknown_attributes_pass_through() {
        let json = r#"{"_id": "r3", "status": {"type": "warning", "value": "slow", "category": "Slow run", "priority": "low"}, "platform": "amazon", "reportState": "open"}"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_str(), "r3");
        assert_eq!(record.platform.as_deref(), Some("amazon"));
        assert_eq!(record.extra.get("reportState").and_then(|v| v.as_str()), Some("open"));
        assert_eq!(record.issue().unwrap().category, "Slow run");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["status"]["type"], "warning");
        assert_eq!(back["reportState"], "open");
    }

    #[test]
    fn category_order_from_input() {
        assert_eq!(CategoryOrder::from_input("alpha"), CategoryOrder::Alphabetical);
        assert_eq!(CategoryOrder::from_input(""), CategoryOrder::Extraction);
        assert_eq!(
            CategoryOrder::from_input("b, a"),
            CategoryOrder::Explicit(vec!["b".into(), "a".into()])
        );
    }

    #[test]
    fn config_defaults_fill_missing_fields() {
        let config: AppConfig = serde_json::from_str(r#"{"storage_directory": "/tmp/x"}"#).unwrap();
        assert_eq!(config.hover_coalesce_ms, 100);
        assert!(config.watch_storage);
        assert_eq!(config.default_excluded_categories, default_excluded_categories());
    }
}
