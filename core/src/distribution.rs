//! Category/subtype distribution over the filtered record set.
//!
//! A pure derivation, safe to recompute on every render.

use std::collections::BTreeSet;

use hashbrown::HashMap;
use runlens_types::{CategoryOrder, Distribution, DistributionRow, Record, RecordId, RowKind};

use crate::taxonomy::{CategoryEntry, SubtypeKey, Taxonomy};

/// Share of `count` in `total`, 0 when nothing is in scope
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Build the ordered distribution rows.
///
/// Every taxonomy category gets a top-level row (possibly with a zero count).
/// Categories that are both expanded and expandable are followed by their
/// subtype rows in extraction order.
pub fn aggregate<'a, I>(
    filtered: I,
    taxonomy: &Taxonomy,
    expanded: &BTreeSet<String>,
    order: &CategoryOrder,
) -> Distribution
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut by_category: HashMap<&str, Vec<RecordId>> = HashMap::new();
    let mut by_subtype: HashMap<SubtypeKey, Vec<RecordId>> = HashMap::new();
    let mut total_in_scope = 0;

    for record in filtered {
        let Some(issue) = record.issue() else {
            continue;
        };
        let Some(category) = taxonomy.get(&issue.value) else {
            continue;
        };
        total_in_scope += 1;
        by_category
            .entry(category.key.as_str())
            .or_default()
            .push(record.id.clone());
        by_subtype
            .entry(SubtypeKey::for_issue(issue, &category.label))
            .or_default()
            .push(record.id.clone());
    }

    let mut rows = Vec::new();
    for category in ordered_categories(taxonomy, &by_category, order) {
        let record_ids = by_category.remove(category.key.as_str()).unwrap_or_default();
        let expandable = category.is_expandable();
        let is_expanded = expandable && expanded.contains(&category.key);

        rows.push(DistributionRow {
            name: category.key.clone(),
            count: record_ids.len(),
            percentage: percentage(record_ids.len(), total_in_scope),
            kind: RowKind::Category {
                expandable,
                expanded: is_expanded,
            },
            record_ids,
        });

        if !is_expanded {
            continue;
        }
        for subtype in &category.subtypes {
            let record_ids = by_subtype.remove(&subtype.key).unwrap_or_default();
            rows.push(DistributionRow {
                name: subtype.label.clone(),
                count: record_ids.len(),
                percentage: percentage(record_ids.len(), total_in_scope),
                kind: RowKind::Subtype {
                    parent: category.key.clone(),
                    key: subtype.key.to_string(),
                },
                record_ids,
            });
        }
    }

    Distribution {
        rows,
        total_in_scope,
    }
}

fn ordered_categories<'t>(
    taxonomy: &'t Taxonomy,
    counts: &HashMap<&str, Vec<RecordId>>,
    order: &CategoryOrder,
) -> Vec<&'t CategoryEntry> {
    let mut categories: Vec<&CategoryEntry> = taxonomy.categories().iter().collect();
    match order {
        CategoryOrder::Extraction => {}
        CategoryOrder::Alphabetical => {
            categories.sort_by(|a, b| {
                a.key
                    .to_lowercase()
                    .cmp(&b.key.to_lowercase())
                    .then_with(|| a.key.cmp(&b.key))
            });
        }
        CategoryOrder::CountDescending => {
            let count = |c: &CategoryEntry| counts.get(c.key.as_str()).map_or(0, Vec::len);
            // Stable sort keeps extraction order among ties
            categories.sort_by(|a, b| count(b).cmp(&count(a)));
        }
        CategoryOrder::Explicit(list) => {
            let rank = |c: &CategoryEntry| {
                list.iter()
                    .position(|k| *k == c.key)
                    .unwrap_or(usize::MAX)
            };
            categories.sort_by_key(|c| rank(c));
        }
    }
    categories
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::filter_records;
    use crate::selection::SelectionState;
    use crate::test_support::{error, scenario_records, success, warning};

    fn expanded(categories: &[&str]) -> BTreeSet<String> {
        categories.iter().map(|c| c.to_string()).collect()
    }

    fn names(distribution: &Distribution) -> Vec<&str> {
        distribution.rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn percentages_relative_to_in_scope_issues() {
        let mut records = scenario_records();
        records.push(success("ok-1"));
        let taxonomy = Taxonomy::extract(&records);

        let dist = aggregate(&records, &taxonomy, &expanded(&[]), &CategoryOrder::Extraction);
        assert_eq!(dist.total_in_scope, 10);
        assert_eq!(names(&dist), vec!["A", "B"]);
        assert_eq!(dist.rows[0].count, 6);
        assert!((dist.rows[0].percentage - 60.0).abs() < 1e-9);
        assert!((dist.rows[1].percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn empty_scope_yields_zero_percentages() {
        let records = scenario_records();
        let taxonomy = Taxonomy::extract(&records);
        let none = SelectionState::default();
        let filtered = filter_records(&records, &none, &taxonomy);

        let dist = aggregate(filtered, &taxonomy, &expanded(&["A"]), &CategoryOrder::Extraction);
        assert_eq!(dist.total_in_scope, 0);
        assert!(!dist.rows.is_empty());
        assert!(dist.rows.iter().all(|r| r.count == 0 && r.percentage == 0.0));
    }

    #[test]
    fn subtype_rows_follow_expanded_parent() {
        let records = scenario_records();
        let taxonomy = Taxonomy::extract(&records);

        let dist = aggregate(
            &records,
            &taxonomy,
            &expanded(&["A", "B"]),
            &CategoryOrder::Extraction,
        );
        // B has a single subtype, so it never expands
        assert_eq!(names(&dist), vec!["A", "timeout", "denied", "B"]);
        assert_eq!(
            dist.rows[1].kind,
            RowKind::Subtype {
                parent: "A".into(),
                key: "A::timeout".into()
            }
        );
        assert_eq!(dist.rows[1].count, 3);
        assert!((dist.rows[1].percentage - 30.0).abs() < 1e-9);
        assert_eq!(
            dist.rows[3].kind,
            RowKind::Category {
                expandable: false,
                expanded: false
            }
        );
    }

    #[test]
    fn alphabetical_and_explicit_order() {
        let records = vec![
            error("1", "zeta", "x"),
            error("2", "Alpha", "x"),
            warning("3", "beta", "x"),
        ];
        let taxonomy = Taxonomy::extract(&records);

        let dist = aggregate(&records, &taxonomy, &expanded(&[]), &CategoryOrder::Alphabetical);
        assert_eq!(names(&dist), vec!["Alpha", "beta", "zeta"]);

        let order = CategoryOrder::Explicit(vec!["beta".into(), "missing".into()]);
        let dist = aggregate(&records, &taxonomy, &expanded(&[]), &order);
        assert_eq!(names(&dist), vec!["beta", "zeta", "Alpha"]);
    }

    #[test]
    fn count_descending_keeps_ties_in_extraction_order() {
        let records = vec![
            error("1", "A", "x"),
            error("2", "B", "x"),
            error("3", "B", "x"),
            error("4", "C", "x"),
        ];
        let taxonomy = Taxonomy::extract(&records);

        let dist = aggregate(&records, &taxonomy, &expanded(&[]), &CategoryOrder::CountDescending);
        assert_eq!(names(&dist), vec!["B", "A", "C"]);
    }

    #[test]
    fn rows_carry_member_records() {
        let records = scenario_records();
        let taxonomy = Taxonomy::extract(&records);

        let dist = aggregate(&records, &taxonomy, &expanded(&["A"]), &CategoryOrder::Extraction);
        let timeout = dist.row("timeout").unwrap();
        let ids: Vec<&str> = timeout.record_ids.iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["a-timeout-0", "a-timeout-1", "a-timeout-2"]);
    }

    mod proptest_distribution {
        use super::*;
        use proptest::prelude::*;

        const CATEGORIES: [&str; 3] = ["A", "B", "C"];
        const MESSAGES: [&str; 3] = ["timeout", "denied", ""];

        proptest! {
            /// Top-level percentages add up to 100 whenever anything is in scope.
            #[test]
            fn top_level_percentages_sum_to_100(
                rows in proptest::collection::vec((0usize..3, 0usize..3, any::<bool>()), 1..50),
            ) {
                let records: Vec<Record> = rows
                    .iter()
                    .enumerate()
                    .map(|(i, &(cat, msg, is_error))| {
                        let id = format!("r{i}");
                        if is_error {
                            error(&id, CATEGORIES[cat], MESSAGES[msg])
                        } else {
                            warning(&id, CATEGORIES[cat], MESSAGES[msg])
                        }
                    })
                    .collect();
                let taxonomy = Taxonomy::extract(&records);
                let all = expanded(&CATEGORIES);

                let dist = aggregate(&records, &taxonomy, &all, &CategoryOrder::Extraction);
                let sum: f64 = dist.categories().map(|r| r.percentage).sum();
                prop_assert!((sum - 100.0).abs() < 1e-6, "sum was {sum}");

                for category in dist.categories() {
                    let sub_sum: usize = dist.subtypes_of(&category.name).map(|r| r.count).sum();
                    if category.kind == (RowKind::Category { expandable: true, expanded: true }) {
                        prop_assert_eq!(sub_sum, category.count);
                    }
                }
            }
        }
    }
}
