//! Two-level record filtering.
//!
//! Membership is a pure function of the record status, the selection and the
//! taxonomy snapshot:
//! 1. success/pending records always pass
//! 2. error/warning records pass only when their category is selected
//! 3. for expandable categories, once any meaningful subtype is selected the
//!    record's composite key must be selected too
//! 4. non-expandable categories never consult subtype selection
//!
//! A subtype key is meaningful only while its category is both selected and
//! expandable. Keys under any other category are inert and never narrow.

use runlens_types::Record;

use crate::selection::SelectionState;
use crate::taxonomy::Taxonomy;

/// Check a single record against the selection
pub fn passes(record: &Record, selection: &SelectionState, taxonomy: &Taxonomy) -> bool {
    passes_with(record, selection, taxonomy, selection.has_subtype_narrowing(taxonomy))
}

fn passes_with(
    record: &Record,
    selection: &SelectionState,
    taxonomy: &Taxonomy,
    narrowing: bool,
) -> bool {
    let Some(issue) = record.issue() else {
        return true;
    };

    if !selection.selected_categories.contains(&issue.value) {
        return false;
    }

    // No subtype selection means "subtype filter inactive", not "select nothing"
    if !narrowing || !taxonomy.can_expand(&issue.value) {
        return true;
    }

    taxonomy
        .key_for(issue)
        .is_some_and(|key| selection.selected_subtypes.contains(&key))
}

/// Filter records, preserving input order
pub fn filter_records<'a, I>(
    records: I,
    selection: &SelectionState,
    taxonomy: &Taxonomy,
) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let narrowing = selection.has_subtype_narrowing(taxonomy);
    records
        .into_iter()
        .filter(|record| passes_with(record, selection, taxonomy, narrowing))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::SubtypeKey;
    use crate::test_support::{error, pending, scenario_records, success, warning};

    fn select(categories: &[&str], subtypes: &[&str]) -> SelectionState {
        let mut state = SelectionState::with_categories(categories.iter().copied());
        state.selected_subtypes = subtypes
            .iter()
            .filter_map(|k| SubtypeKey::parse(k))
            .collect();
        state
    }

    fn ids(records: &[&Record]) -> Vec<String> {
        records.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn success_and_pending_always_pass() {
        let records = vec![success("s1"), pending("p1"), error("e1", "A", "x")];
        let taxonomy = Taxonomy::extract(&records);

        let filtered = filter_records(&records, &SelectionState::default(), &taxonomy);
        assert_eq!(ids(&filtered), vec!["s1", "p1"]);
    }

    #[test]
    fn empty_category_selection_drops_all_issues() {
        let records = scenario_records();
        let taxonomy = Taxonomy::extract(&records);
        let state = select(&[], &["A::timeout"]);

        let filtered = filter_records(&records, &state, &taxonomy);
        assert!(filtered.iter().all(|r| r.issue().is_none()));
        assert!(filtered.is_empty());
    }

    #[test]
    fn scenario_category_then_subtype() {
        let records = scenario_records();
        let taxonomy = Taxonomy::extract(&records);

        assert!(taxonomy.can_expand("A"));
        assert!(!taxonomy.can_expand("B"));

        let only_a = select(&["A"], &[]);
        assert_eq!(filter_records(&records, &only_a, &taxonomy).len(), 6);

        let a_timeout = select(&["A"], &["A::timeout"]);
        assert_eq!(filter_records(&records, &a_timeout, &taxonomy).len(), 3);
    }

    #[test]
    fn subtype_keys_under_non_expandable_category_are_inert() {
        let records = scenario_records();
        let taxonomy = Taxonomy::extract(&records);

        let without = select(&["B"], &[]);
        let with = select(&["B"], &["B::denied", "B::other"]);
        assert_eq!(
            ids(&filter_records(&records, &without, &taxonomy)),
            ids(&filter_records(&records, &with, &taxonomy))
        );

        // An inert key must not switch on narrowing for expandable A either
        let without = select(&["A", "B"], &[]);
        let with = select(&["A", "B"], &["B::denied"]);
        assert_eq!(
            ids(&filter_records(&records, &without, &taxonomy)),
            ids(&filter_records(&records, &with, &taxonomy))
        );
    }

    #[test]
    fn keys_under_deselected_category_are_inert() {
        let records = scenario_records();
        let taxonomy = Taxonomy::extract(&records);

        let state = select(&["B"], &["A::timeout"]);
        assert_eq!(filter_records(&records, &state, &taxonomy).len(), 4);
    }

    #[test]
    fn any_subtype_selection_narrows_every_expandable_category() {
        let records = vec![
            error("1", "A", "timeout"),
            error("2", "A", "denied"),
            warning("3", "C", "slow"),
            warning("4", "C", "flaky"),
            error("5", "B", "denied"),
        ];
        let taxonomy = Taxonomy::extract(&records);
        let state = select(&["A", "B", "C"], &["A::timeout"]);

        let filtered = filter_records(&records, &state, &taxonomy);
        // C is expandable with no matching key; B is not expandable
        assert_eq!(ids(&filtered), vec!["1", "5"]);
    }

    #[test]
    fn filter_does_not_mutate_inputs() {
        let records = scenario_records();
        let snapshot = records.clone();
        let taxonomy = Taxonomy::extract(&records);
        let state = select(&["A"], &["A::denied"]);
        let state_before = state.clone();

        let first = ids(&filter_records(&records, &state, &taxonomy));
        let second = ids(&filter_records(&records, &state, &taxonomy));

        assert_eq!(first, second);
        assert_eq!(records, snapshot);
        assert_eq!(state, state_before);
    }

    mod proptest_filter {
        use super::*;
        use proptest::prelude::*;

        const CATEGORIES: [&str; 4] = ["A", "B", "C", "D"];
        const MESSAGES: [&str; 3] = ["timeout", "denied", ""];

        fn arb_records() -> impl Strategy<Value = Vec<Record>> {
            proptest::collection::vec((0usize..4, 0usize..3, 0usize..4), 0..40).prop_map(|rows| {
                rows.into_iter()
                    .enumerate()
                    .map(|(i, (cat, msg, kind))| {
                        let id = format!("r{i}");
                        match kind {
                            0 => success(&id),
                            1 => pending(&id),
                            2 => warning(&id, CATEGORIES[cat], MESSAGES[msg]),
                            _ => error(&id, CATEGORIES[cat], MESSAGES[msg]),
                        }
                    })
                    .collect()
            })
        }

        proptest! {
            /// Growing the category selection never drops a record.
            #[test]
            fn category_selection_is_monotonic(
                records in arb_records(),
                small in proptest::collection::btree_set(0usize..4, 0..4),
                extra in proptest::collection::btree_set(0usize..4, 0..4),
            ) {
                let taxonomy = Taxonomy::extract(&records);
                let s1 = SelectionState::with_categories(small.iter().map(|&i| CATEGORIES[i]));
                let s2 = SelectionState::with_categories(
                    small.union(&extra).map(|&i| CATEGORIES[i]),
                );

                let f1 = ids(&filter_records(&records, &s1, &taxonomy));
                let f2 = ids(&filter_records(&records, &s2, &taxonomy));
                for id in &f1 {
                    prop_assert!(f2.contains(id), "{id} lost when growing selection");
                }
            }

            /// With no categories selected only success/pending records remain.
            #[test]
            fn no_categories_means_no_issues(records in arb_records()) {
                let taxonomy = Taxonomy::extract(&records);
                let mut state = SelectionState::default();
                state.selected_subtypes.insert(SubtypeKey::new("A", "timeout"));

                let filtered = filter_records(&records, &state, &taxonomy);
                prop_assert!(filtered.iter().all(|r| r.issue().is_none()));
            }
        }
    }
}
