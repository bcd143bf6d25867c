//! Category → subtype classification of error and warning records.
//!
//! The taxonomy is always extracted from the full record collection so that the
//! set of subtype options stays stable while filtered counts change.

use std::collections::BTreeSet;
use std::fmt;

use hashbrown::HashMap;
use runlens_types::{Issue, Record, RecordId};

/// Separator between category and subtype label in a composite key
pub const SUBTYPE_SEPARATOR: &str = "::";

// ─────────────────────────────────────────────────────────────────────────────
// Composite Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Composite `"<category>::<label>"` key addressing one subtype under one category.
///
/// Equal labels under different categories produce distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubtypeKey(String);

impl SubtypeKey {
    pub fn new(category: &str, label: &str) -> Self {
        Self(format!("{category}{SUBTYPE_SEPARATOR}{label}"))
    }

    /// Key for the subtype an issue is classified under, given the label of
    /// its category
    pub fn for_issue(issue: &Issue, category_label: &str) -> Self {
        Self::new(&issue.value, subtype_label(issue, category_label))
    }

    /// Parse a persisted key. Requires a separator and a non-empty category.
    pub fn parse(raw: &str) -> Option<Self> {
        let (category, _) = raw.split_once(SUBTYPE_SEPARATOR)?;
        if category.is_empty() {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    pub fn category(&self) -> &str {
        self.0
            .split_once(SUBTYPE_SEPARATOR)
            .map(|(category, _)| category)
            .unwrap_or(&self.0)
    }

    pub fn label(&self) -> &str {
        self.0
            .split_once(SUBTYPE_SEPARATOR)
            .map(|(_, label)| label)
            .unwrap_or_default()
    }

    /// True if the key carries the `"<category>::"` prefix
    pub fn belongs_to(&self, category: &str) -> bool {
        self.0
            .strip_prefix(category)
            .is_some_and(|rest| rest.starts_with(SUBTYPE_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubtypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subtype label for an issue: the trimmed message when it is non-empty and
/// differs from the category key, otherwise the category's label.
///
/// The fallback is the label recorded for the whole category, so every
/// message-less record of one category lands in the same subtype.
pub fn subtype_label<'a>(issue: &'a Issue, category_label: &'a str) -> &'a str {
    let message = issue.message.trim();
    if message.is_empty() || message == issue.value {
        category_label
    } else {
        message
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Taxonomy
// ─────────────────────────────────────────────────────────────────────────────

/// One distinct subtype of a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtypeEntry {
    pub category: String,
    pub label: String,
    pub key: SubtypeKey,
    /// Member records in first-seen order
    pub record_ids: Vec<RecordId>,
}

impl SubtypeEntry {
    pub fn count(&self) -> usize {
        self.record_ids.len()
    }
}

/// One top-level category with its subtypes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEntry {
    pub key: String,
    /// Label of the first record seen in this category
    pub label: String,
    pub record_ids: Vec<RecordId>,
    /// Subtypes in extraction order
    pub subtypes: Vec<SubtypeEntry>,
}

impl CategoryEntry {
    pub fn count(&self) -> usize {
        self.record_ids.len()
    }

    /// A category can be drilled into only when it has more than one subtype
    pub fn is_expandable(&self) -> bool {
        self.subtypes.len() > 1
    }
}

/// Two-level classification of a record collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    categories: Vec<CategoryEntry>,
    index: HashMap<String, usize>,
}

impl Taxonomy {
    /// Classify every error/warning record; success and pending records are ignored.
    pub fn extract<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut taxonomy = Self::default();
        // (category idx, label) -> subtype idx within that category
        let mut subtype_index: HashMap<(usize, String), usize> = HashMap::new();

        for record in records {
            let Some(issue) = record.issue() else {
                continue;
            };

            let cat_idx = match taxonomy.index.get(issue.value.as_str()) {
                Some(&idx) => idx,
                None => {
                    let idx = taxonomy.categories.len();
                    taxonomy.categories.push(CategoryEntry {
                        key: issue.value.clone(),
                        label: issue.category.clone(),
                        record_ids: Vec::new(),
                        subtypes: Vec::new(),
                    });
                    taxonomy.index.insert(issue.value.clone(), idx);
                    idx
                }
            };

            let category = &mut taxonomy.categories[cat_idx];
            category.record_ids.push(record.id.clone());

            let label = subtype_label(issue, &category.label).to_string();
            let sub_idx = *subtype_index
                .entry((cat_idx, label.clone()))
                .or_insert_with(|| {
                    category.subtypes.push(SubtypeEntry {
                        category: issue.value.clone(),
                        key: SubtypeKey::new(&issue.value, &label),
                        label,
                        record_ids: Vec::new(),
                    });
                    category.subtypes.len() - 1
                });
            category.subtypes[sub_idx].record_ids.push(record.id.clone());
        }

        tracing::debug!(
            categories = taxonomy.categories.len(),
            expandable = taxonomy.categories.iter().filter(|c| c.is_expandable()).count(),
            "Taxonomy extracted"
        );
        taxonomy
    }

    pub fn can_expand(&self, category: &str) -> bool {
        self.get(category).is_some_and(CategoryEntry::is_expandable)
    }

    /// Subtypes of a category in extraction order; empty for unknown categories
    pub fn subtypes_of(&self, category: &str) -> &[SubtypeEntry] {
        self.get(category)
            .map(|c| c.subtypes.as_slice())
            .unwrap_or_default()
    }

    pub fn get(&self, category: &str) -> Option<&CategoryEntry> {
        self.index.get(category).map(|&idx| &self.categories[idx])
    }

    /// Key of the subtype an issue falls under; `None` if its category is unknown
    pub fn key_for(&self, issue: &Issue) -> Option<SubtypeKey> {
        self.get(&issue.value)
            .map(|category| SubtypeKey::for_issue(issue, &category.label))
    }

    pub fn contains(&self, category: &str) -> bool {
        self.index.contains_key(category)
    }

    /// True if the key's category is known and lists that exact subtype
    pub fn contains_subtype(&self, key: &SubtypeKey) -> bool {
        self.subtypes_of(key.category())
            .iter()
            .any(|s| &s.key == key)
    }

    pub fn categories(&self) -> &[CategoryEntry] {
        &self.categories
    }

    /// Category keys in extraction order
    pub fn category_keys(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.key.as_str())
    }

    pub fn available(&self) -> BTreeSet<String> {
        self.categories.iter().map(|c| c.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runlens_types::RunStatus;

    fn issue(value: &str, message: &str) -> Issue {
        Issue {
            value: value.to_string(),
            message: message.to_string(),
            category: value.to_string(),
            priority: "high".to_string(),
        }
    }

    fn error(id: &str, value: &str, message: &str) -> Record {
        Record::new(id, RunStatus::Error(issue(value, message)))
    }

    #[test]
    fn composite_key_format() {
        let key = SubtypeKey::new("login_failed", "timeout");
        assert_eq!(key.as_str(), "login_failed::timeout");
        assert_eq!(key.category(), "login_failed");
        assert_eq!(key.label(), "timeout");
    }

    #[test]
    fn composite_key_parse_rejects_malformed() {
        assert!(SubtypeKey::parse("no_separator").is_none());
        assert!(SubtypeKey::parse("::label").is_none());
        let key = SubtypeKey::parse("a::b::c").unwrap();
        assert_eq!(key.category(), "a");
        assert_eq!(key.label(), "b::c");
    }

    #[test]
    fn belongs_to_requires_full_prefix() {
        let key = SubtypeKey::new("auth", "denied");
        assert!(key.belongs_to("auth"));
        assert!(!key.belongs_to("aut"));
        assert!(!key.belongs_to("auth_extra"));
    }

    #[test]
    fn label_falls_back_to_category_label() {
        let mut i = issue("blocked", "");
        assert_eq!(subtype_label(&i, "Blocked by site"), "Blocked by site");

        i.message = "blocked".to_string();
        assert_eq!(subtype_label(&i, "Blocked by site"), "Blocked by site");

        i.message = "  captcha  ".to_string();
        assert_eq!(subtype_label(&i, "Blocked by site"), "captcha");
    }

    #[test]
    fn extract_groups_by_category_and_message() {
        let records = vec![
            error("1", "A", "timeout"),
            error("2", "A", "denied"),
            error("3", "A", "timeout"),
            error("4", "B", "denied"),
            Record::new(
                "5",
                RunStatus::Success {
                    value: "ok".into(),
                    message: String::new(),
                },
            ),
        ];
        let taxonomy = Taxonomy::extract(&records);

        assert_eq!(taxonomy.category_keys().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(taxonomy.can_expand("A"));
        assert!(!taxonomy.can_expand("B"));
        assert!(!taxonomy.contains("ok"));

        let subtypes = taxonomy.subtypes_of("A");
        assert_eq!(subtypes.len(), 2);
        assert_eq!(subtypes[0].label, "timeout");
        assert_eq!(subtypes[0].count(), 2);
        assert_eq!(subtypes[1].key.as_str(), "A::denied");
    }

    #[test]
    fn same_label_under_different_categories_is_distinct() {
        let records = vec![error("1", "A", "denied"), error("2", "B", "denied")];
        let taxonomy = Taxonomy::extract(&records);
        assert_ne!(
            taxonomy.subtypes_of("A")[0].key,
            taxonomy.subtypes_of("B")[0].key
        );
    }

    #[test]
    fn empty_messages_get_single_synthesized_subtype() {
        let records = vec![error("1", "C", ""), error("2", "C", "   ")];
        let taxonomy = Taxonomy::extract(&records);

        let subtypes = taxonomy.subtypes_of("C");
        assert_eq!(subtypes.len(), 1);
        assert_eq!(subtypes[0].label, "C");
        assert_eq!(subtypes[0].count(), 2);
        assert!(!taxonomy.can_expand("C"));
    }

    #[test]
    fn message_less_records_share_the_first_category_label() {
        let mut first = issue("D", "");
        first.category = "Data missing".to_string();
        let mut second = issue("D", "");
        second.category = "No data".to_string();
        let records = vec![
            Record::new("1", RunStatus::Error(first)),
            Record::new("2", RunStatus::Warning(second.clone())),
        ];
        let taxonomy = Taxonomy::extract(&records);

        let subtypes = taxonomy.subtypes_of("D");
        assert_eq!(subtypes.len(), 1);
        assert_eq!(subtypes[0].label, "Data missing");
        assert_eq!(subtypes[0].count(), 2);
        assert!(!taxonomy.can_expand("D"));
        assert_eq!(
            taxonomy.key_for(&second),
            Some(SubtypeKey::new("D", "Data missing"))
        );
    }

    #[test]
    fn unknown_category_has_no_subtypes() {
        let taxonomy = Taxonomy::extract(&Vec::<Record>::new());
        assert!(taxonomy.is_empty());
        assert!(taxonomy.subtypes_of("missing").is_empty());
        assert!(!taxonomy.can_expand("missing"));
    }
}
