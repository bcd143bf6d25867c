//! Record feed: the full record collection plus the currently fetched page.

use std::fs;
use std::path::Path;

use runlens_types::Record;
use serde::Deserialize;

use crate::context::FeedError;

/// Records handed to the selection engine.
///
/// The taxonomy is always built from `all`; filtering runs over the page, or
/// over `all` when no page is set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFeed {
    all: Vec<Record>,
    page: Option<Vec<Record>>,
}

/// On-disk shapes accepted by [`RecordFeed::load`]
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedFile {
    Plain(Vec<Record>),
    Paged {
        records: Vec<Record>,
        #[serde(default)]
        page: Option<Vec<Record>>,
    },
}

impl RecordFeed {
    pub fn new(all: Vec<Record>) -> Self {
        Self { all, page: None }
    }

    pub fn with_page(all: Vec<Record>, page: Vec<Record>) -> Self {
        Self {
            all,
            page: Some(page),
        }
    }

    pub fn all(&self) -> &[Record] {
        &self.all
    }

    /// Records subject to filtering
    pub fn page(&self) -> &[Record] {
        self.page.as_deref().unwrap_or(&self.all)
    }

    pub fn has_page(&self) -> bool {
        self.page.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    /// Load a feed from a JSON file holding either an array of records or
    /// `{"records": [...], "page": [...]}`.
    pub fn load(path: &Path) -> Result<Self, FeedError> {
        let content = fs::read_to_string(path).map_err(|source| FeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let feed = Self::parse(&content).map_err(|source| FeedError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(
            path = %path.display(),
            records = feed.all.len(),
            page = feed.page.as_ref().map(Vec::len),
            "Record feed loaded"
        );
        Ok(feed)
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str(content)? {
            FeedFile::Plain(all) => Self::new(all),
            FeedFile::Paged { records, page } => Self {
                all: records,
                page,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlens_types::StatusKind;

    #[test]
    fn parse_plain_array() {
        let feed = RecordFeed::parse(
            r#"[
                {"_id": "1", "status": {"type": "error", "value": "A", "message": "timeout"}},
                {"id": "2", "status": {"type": "success", "value": "completed"}, "owner": "x"}
            ]"#,
        )
        .unwrap();

        assert_eq!(feed.all().len(), 2);
        assert!(!feed.has_page());
        assert_eq!(feed.page().len(), 2);
        assert_eq!(feed.all()[0].status.kind(), StatusKind::Error);
        assert_eq!(feed.all()[1].extra.get("owner").and_then(|v| v.as_str()), Some("x"));
    }

    #[test]
    fn parse_paged_object() {
        let feed = RecordFeed::parse(
            r#"{
                "records": [
                    {"id": "1", "status": {"type": "error", "value": "A"}},
                    {"id": "2", "status": {"type": "warning", "value": "B"}}
                ],
                "page": [{"id": "2", "status": {"type": "warning", "value": "B"}}]
            }"#,
        )
        .unwrap();

        assert_eq!(feed.all().len(), 2);
        assert_eq!(feed.page().len(), 1);
        let issue = feed.page()[0].issue().unwrap();
        assert_eq!(issue.category, "B");
        assert_eq!(issue.priority, runlens_types::UNKNOWN_PRIORITY);
    }

    #[test]
    fn load_reports_path_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.json");

        let err = RecordFeed::load(&path).unwrap_err();
        assert!(matches!(err, FeedError::Read { .. }));

        fs::write(&path, "{ not json").unwrap();
        let err = RecordFeed::load(&path).unwrap_err();
        assert!(matches!(err, FeedError::Parse { .. }));
        assert!(err.to_string().contains("feed.json"));
    }
}
