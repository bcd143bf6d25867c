use std::collections::BTreeSet;

use hashbrown::HashMap;
use runlens_types::{CategoryOrder, Distribution, Record};

use super::persistence::{Hydrated, decode_categories, decode_subtypes, encode_list};
use super::store::{SelectionStore, StorageChange, StorageKey};
use super::SelectionState;
use crate::distribution::aggregate;
use crate::feed::RecordFeed;
use crate::filter::filter_records;
use crate::taxonomy::{SubtypeEntry, SubtypeKey, Taxonomy};

/// Owns the selection for one session: hydration, mutation, persistence,
/// reconciliation with other sessions and the derived filtered record set.
///
/// All storage access for the selection goes through here.
pub struct SelectionEngine<S: SelectionStore> {
    store: S,
    excluded: BTreeSet<String>,

    feed: RecordFeed,
    taxonomy: Taxonomy,
    loaded: bool,

    state: SelectionState,
    /// Hydration found nothing usable; the default selection is applied to the
    /// first non-empty dataset
    pending_default: bool,

    filtered: Vec<Record>,
    /// Last payload written or adopted per key, to skip redundant writes
    persisted: HashMap<StorageKey, String>,
}

impl<S: SelectionStore> SelectionEngine<S> {
    /// Hydrate from storage. Absent or malformed category payloads defer to the
    /// default selection once records arrive.
    pub fn init<I, C>(store: S, excluded: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        let mut persisted = HashMap::new();
        let categories_raw = read_entry(&store, StorageKey::SelectedCategories);
        let subtypes_raw = read_entry(&store, StorageKey::SelectedSubtypes);
        for (key, raw) in [
            (StorageKey::SelectedCategories, &categories_raw),
            (StorageKey::SelectedSubtypes, &subtypes_raw),
        ] {
            if let Some(raw) = raw {
                persisted.insert(key, raw.clone());
            }
        }

        let (selected_categories, pending_default) =
            match decode_categories(categories_raw.as_deref()) {
                Hydrated::Stored(categories) => (categories, false),
                Hydrated::Default => (BTreeSet::new(), true),
            };
        let selected_subtypes = if pending_default {
            BTreeSet::new()
        } else {
            decode_subtypes(subtypes_raw.as_deref())
        };

        tracing::info!(
            categories = selected_categories.len(),
            subtypes = selected_subtypes.len(),
            pending_default,
            "Selection hydrated"
        );

        Self {
            store,
            excluded: excluded.into_iter().map(Into::into).collect(),
            feed: RecordFeed::default(),
            taxonomy: Taxonomy::default(),
            loaded: false,
            state: SelectionState {
                selected_categories,
                selected_subtypes,
                expanded_categories: BTreeSet::new(),
            },
            pending_default,
            filtered: Vec::new(),
            persisted,
        }
    }

    // --- Dataset ---

    /// Replace the record feed, re-extract the taxonomy and reconcile the
    /// selection against it.
    pub fn set_records(&mut self, feed: RecordFeed) {
        self.taxonomy = Taxonomy::extract(feed.all());
        self.feed = feed;
        self.loaded = true;

        if self.pending_default && !self.taxonomy.is_empty() {
            self.pending_default = false;
            self.state.selected_categories = self.default_categories();
            self.state.selected_subtypes.clear();
            self.state
                .expanded_categories
                .retain(|c| self.taxonomy.can_expand(c));
            self.persist(StorageKey::SelectedCategories);
            self.persist(StorageKey::SelectedSubtypes);
        } else {
            let pruned = self.state.prune_to(&self.taxonomy);
            if pruned.categories {
                tracing::info!(
                    remaining = self.state.selected_categories.len(),
                    "Pruned categories missing from dataset"
                );
                self.persist(StorageKey::SelectedCategories);
            }
            if pruned.subtypes {
                self.persist(StorageKey::SelectedSubtypes);
            }
        }

        tracing::info!(
            records = self.feed.all().len(),
            categories = self.taxonomy.len(),
            "Dataset loaded"
        );
        self.recompute();
    }

    // --- Category selection ---

    /// Select a category. Unknown categories are ignored.
    pub fn add_error_value(&mut self, category: &str) -> bool {
        if !self.taxonomy.contains(category) {
            tracing::debug!(category, "Ignoring unknown category");
            return false;
        }
        let added = self.state.selected_categories.insert(category.to_string());
        self.persist(StorageKey::SelectedCategories);
        self.recompute();
        added
    }

    /// Deselect a category and drop its subtype keys
    pub fn remove_error_value(&mut self, category: &str) -> bool {
        let removed = self.state.selected_categories.remove(category);
        if self.state.clear_subtypes_for(category) {
            self.persist(StorageKey::SelectedSubtypes);
        }
        self.persist(StorageKey::SelectedCategories);
        self.recompute();
        removed
    }

    /// Replace the category selection with `categories` that are available.
    /// Subtype keys are left alone.
    pub fn select_all<I, C>(&mut self, categories: I)
    where
        I: IntoIterator<Item = C>,
        C: AsRef<str>,
    {
        self.state.selected_categories = categories
            .into_iter()
            .filter(|c| self.taxonomy.contains(c.as_ref()))
            .map(|c| c.as_ref().to_string())
            .collect();
        self.persist(StorageKey::SelectedCategories);
        self.recompute();
    }

    pub fn select_none(&mut self) {
        self.state.selected_categories.clear();
        self.state.selected_subtypes.clear();
        self.persist(StorageKey::SelectedCategories);
        self.persist(StorageKey::SelectedSubtypes);
        self.recompute();
    }

    /// Every available category except the configured denylist
    pub fn select_default(&mut self) {
        self.state.selected_categories = self.default_categories();
        self.state.selected_subtypes.clear();
        self.persist(StorageKey::SelectedCategories);
        self.persist(StorageKey::SelectedSubtypes);
        self.recompute();
    }

    // --- Subtype selection ---

    /// Keys under non-expandable or deselected categories are accepted but inert
    pub fn add_subtype(&mut self, key: SubtypeKey) -> bool {
        let added = self.state.selected_subtypes.insert(key);
        self.persist(StorageKey::SelectedSubtypes);
        self.recompute();
        added
    }

    pub fn remove_subtype(&mut self, key: &SubtypeKey) -> bool {
        let removed = self.state.selected_subtypes.remove(key);
        self.persist(StorageKey::SelectedSubtypes);
        self.recompute();
        removed
    }

    pub fn clear_subtypes_for_error(&mut self, category: &str) {
        self.state.clear_subtypes_for(category);
        self.persist(StorageKey::SelectedSubtypes);
        self.recompute();
    }

    // --- Expansion ---

    /// Expand a category into its subtypes. Only expandable categories expand.
    pub fn expand(&mut self, category: &str) -> bool {
        if !self.taxonomy.can_expand(category) {
            return false;
        }
        self.state.expanded_categories.insert(category.to_string());
        true
    }

    /// Collapse a category, dropping its subtype keys
    pub fn collapse(&mut self, category: &str) {
        self.state.expanded_categories.remove(category);
        self.clear_subtypes_for_error(category);
    }

    /// Returns whether the category is expanded afterwards
    pub fn toggle_expanded(&mut self, category: &str) -> bool {
        if self.state.expanded_categories.contains(category) {
            self.collapse(category);
            false
        } else {
            self.expand(category)
        }
    }

    pub fn can_expand(&self, category: &str) -> bool {
        self.taxonomy.can_expand(category)
    }

    // --- Cross-session reconciliation ---

    /// Adopt a selection change written by another session.
    ///
    /// The payload is untrusted: it is parsed, validated against the current
    /// taxonomy and adopted without being written back.
    pub fn handle_storage_change(&mut self, change: StorageChange) {
        match change.key {
            StorageKey::SelectedCategories => {
                match decode_categories(change.new_value.as_deref()) {
                    Hydrated::Stored(mut categories) => {
                        if self.loaded {
                            categories.retain(|c| self.taxonomy.contains(c));
                        }
                        self.pending_default = false;
                        self.state.selected_categories = categories;
                    }
                    Hydrated::Default if self.loaded && !self.taxonomy.is_empty() => {
                        self.state.selected_categories = self.default_categories();
                    }
                    Hydrated::Default => {
                        self.pending_default = true;
                        self.state.selected_categories.clear();
                    }
                }
            }
            StorageKey::SelectedSubtypes => {
                let mut keys = decode_subtypes(change.new_value.as_deref());
                if self.loaded {
                    keys.retain(|k| self.taxonomy.contains(k.category()));
                }
                self.state.selected_subtypes = keys;
            }
        }

        match change.new_value {
            Some(raw) => {
                self.persisted.insert(change.key, raw);
            }
            None => {
                self.persisted.remove(&change.key);
            }
        }

        tracing::info!(
            key = change.key.as_str(),
            categories = self.state.selected_categories.len(),
            subtypes = self.state.selected_subtypes.len(),
            "Adopted selection from another session"
        );
        self.recompute();
    }

    // --- Accessors ---

    pub fn selected_error_values(&self) -> &BTreeSet<String> {
        &self.state.selected_categories
    }

    pub fn selected_subtypes(&self) -> &BTreeSet<SubtypeKey> {
        &self.state.selected_subtypes
    }

    pub fn expanded_categories(&self) -> &BTreeSet<String> {
        &self.state.expanded_categories
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Page records passing the current selection, in feed order
    pub fn filtered_bots(&self) -> &[Record] {
        &self.filtered
    }

    /// True unless every available category is selected with no effective
    /// subtype narrowing
    pub fn bots_filtered_by_error(&self) -> bool {
        let all_selected = self.taxonomy.len() == self.state.selected_categories.len()
            && self
                .taxonomy
                .category_keys()
                .all(|c| self.state.selected_categories.contains(c));
        !all_selected || self.state.has_subtype_narrowing(&self.taxonomy)
    }

    pub fn distribution(&self, order: &CategoryOrder) -> Distribution {
        aggregate(
            &self.filtered,
            &self.taxonomy,
            &self.state.expanded_categories,
            order,
        )
    }

    /// Available categories minus the denylist
    pub fn default_categories(&self) -> BTreeSet<String> {
        self.taxonomy
            .category_keys()
            .filter(|c| !self.excluded.contains(*c))
            .map(String::from)
            .collect()
    }

    pub fn subtypes_of(&self, category: &str) -> &[SubtypeEntry] {
        self.taxonomy.subtypes_of(category)
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn feed(&self) -> &RecordFeed {
        &self.feed
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // --- Internals ---

    fn persist(&mut self, key: StorageKey) {
        let payload = match key {
            StorageKey::SelectedCategories => {
                encode_list(self.state.selected_categories.iter().map(String::as_str))
            }
            StorageKey::SelectedSubtypes => {
                encode_list(self.state.selected_subtypes.iter().map(SubtypeKey::as_str))
            }
        };
        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(key = key.as_str(), error = %e, "Failed to encode selection");
                return;
            }
        };

        if self.persisted.get(&key) == Some(&payload) {
            return;
        }

        match self.store.write(key, &payload) {
            Ok(()) => {
                tracing::debug!(key = key.as_str(), %payload, "Selection persisted");
                self.persisted.insert(key, payload);
            }
            Err(e) => {
                tracing::warn!(key = key.as_str(), error = %e, "Failed to persist selection");
            }
        }
    }

    fn recompute(&mut self) {
        self.filtered = filter_records(self.feed.page(), &self.state, &self.taxonomy)
            .into_iter()
            .cloned()
            .collect();
        tracing::debug!(
            filtered = self.filtered.len(),
            total = self.feed.page().len(),
            "Filtered records recomputed"
        );
    }
}

fn read_entry<S: SelectionStore>(store: &S, key: StorageKey) -> Option<String> {
    match store.read(key) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(key = key.as_str(), error = %e, "Failed to read selection");
            None
        }
    }
}
