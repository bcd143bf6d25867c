//! Selection state over the category/subtype taxonomy, with persistence and
//! cross-session reconciliation.

mod engine;
pub mod persistence;
pub mod store;


use std::collections::BTreeSet;

use crate::taxonomy::{SubtypeKey, Taxonomy};

pub use engine::SelectionEngine;
pub use persistence::Hydrated;
pub use store::{
    FileStore, MemoryStore, SeenPayloads, SelectionStore, StorageChange, StorageChanges, StorageKey,
};

/// Current selection over the taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub selected_categories: BTreeSet<String>,
    pub selected_subtypes: BTreeSet<SubtypeKey>,
    pub expanded_categories: BTreeSet<String>,
}

/// What a prune against a new taxonomy removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneOutcome {
    pub categories: bool,
    pub subtypes: bool,
}

impl SelectionState {
    pub fn with_categories<I, C>(categories: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            selected_categories: categories.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Remove every subtype key under `category`. Returns true if any was removed.
    pub fn clear_subtypes_for(&mut self, category: &str) -> bool {
        let before = self.selected_subtypes.len();
        self.selected_subtypes.retain(|key| !key.belongs_to(category));
        self.selected_subtypes.len() != before
    }

    /// True if some subtype key can actually narrow the filter, i.e. its
    /// category is both selected and expandable
    pub fn has_subtype_narrowing(&self, taxonomy: &Taxonomy) -> bool {
        self.selected_subtypes.iter().any(|key| {
            let category = key.category();
            self.selected_categories.contains(category) && taxonomy.can_expand(category)
        })
    }

    /// Drop everything that refers to categories or subtypes missing from `taxonomy`
    pub fn prune_to(&mut self, taxonomy: &Taxonomy) -> PruneOutcome {
        let categories_before = self.selected_categories.len();
        self.selected_categories.retain(|c| taxonomy.contains(c));

        let subtypes_before = self.selected_subtypes.len();
        self.selected_subtypes
            .retain(|key| taxonomy.contains_subtype(key));

        // Expansion is view state only; drop it silently
        self.expanded_categories.retain(|c| taxonomy.can_expand(c));

        PruneOutcome {
            categories: self.selected_categories.len() != categories_before,
            subtypes: self.selected_subtypes.len() != subtypes_before,
        }
    }
}
