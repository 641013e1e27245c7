//! Recursive comparison of two JSON trees.
//!
//! Mappings are compared key by key after dropping excluded keys. Sequences
//! are keyed by position (`"0"`, `"1"`, ...) and compared the same way; a
//! sequence diff whose changed positions are exactly `0..n` is handed back as
//! an ordered list, otherwise it stays keyed by index string. Any other pair
//! of values is compared by equality and reported as a single `mod`.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::entry::{DiffEntry, DiffNode};
use crate::error::{DiffError, DiffResult, Side};
use crate::filter::KeyFilter;
use crate::flatten::{flatten, FlattenOptions};
use crate::shape::{index_keyed, is_contiguous_index, Shape};

/// Options for a comparison.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompareOptions {
    /// Keys dropped at every mapping level, in addition to reserved keys.
    pub filter: KeyFilter,
}

impl CompareOptions {
    pub fn with_filter(filter: KeyFilter) -> Self {
        Self { filter }
    }
}

/// Compare two trees.
///
/// Returns `None` when there is nothing to report, either because the trees
/// are equal or because every difference sits under an excluded key.
pub fn compare(old: &Value, new: &Value, options: &CompareOptions) -> Option<DiffNode> {
    let diff = diff_values(old, new, &options.filter);
    if let Some(ref node) = diff {
        debug!(
            additions = node.additions(),
            deletions = node.deletions(),
            modifications = node.modifications(),
            "documents differ"
        );
    }
    diff
}

/// Compare two documents that may be missing.
///
/// A missing document is an argument error rather than "no changes", so a
/// failed lookup is never mistaken for an unchanged record.
pub fn compare_documents(
    old: Option<&Value>,
    new: Option<&Value>,
    options: &CompareOptions,
) -> DiffResult<Option<DiffNode>> {
    let old = old.ok_or(DiffError::MissingDocument(Side::Old))?;
    let new = new.ok_or(DiffError::MissingDocument(Side::New))?;
    Ok(compare(old, new, options))
}

fn diff_values(old: &Value, new: &Value, filter: &KeyFilter) -> Option<DiffNode> {
    if old == new {
        return None;
    }
    match (Shape::of(old), Shape::of(new)) {
        (Shape::Mapping(old_map), Shape::Mapping(new_map)) => {
            diff_keyed(&kept_keys(old_map, filter), &kept_keys(new_map, filter), filter)
                .map(DiffNode::Nested)
        }
        (Shape::Sequence(old_items), Shape::Sequence(new_items)) => diff_keyed(
            &index_keyed(old_items.iter()),
            &index_keyed(new_items.iter()),
            filter,
        )
        .map(restore_sequence),
        _ => Some(DiffNode::Entry(DiffEntry::Mod {
            old: old.clone(),
            new: new.clone(),
        })),
    }
}

fn kept_keys<'a>(map: &'a Map<String, Value>, filter: &KeyFilter) -> BTreeMap<String, &'a Value> {
    map.iter()
        .filter(|(key, _)| filter.keeps(key))
        .map(|(key, value)| (key.clone(), value))
        .collect()
}

fn diff_keyed(
    old: &BTreeMap<String, &Value>,
    new: &BTreeMap<String, &Value>,
    filter: &KeyFilter,
) -> Option<BTreeMap<String, DiffNode>> {
    let mut changes = BTreeMap::new();

    // Deleted and modified keys.
    for (key, old_val) in old {
        match new.get(key) {
            Some(new_val) => {
                if let Some(node) = diff_values(old_val, new_val, filter) {
                    changes.insert(key.clone(), node);
                }
            }
            None => {
                let entry = DiffEntry::Del {
                    old: (*old_val).clone(),
                };
                changes.insert(key.clone(), entry.into());
            }
        }
    }

    // Added keys.
    for (key, new_val) in new {
        if !old.contains_key(key) {
            let entry = DiffEntry::Add {
                new: (*new_val).clone(),
            };
            changes.insert(key.clone(), entry.into());
        }
    }

    (!changes.is_empty()).then_some(changes)
}

/// Turn an index-keyed diff back into an ordered list when its keys cover
/// `0..n` exactly. Anything else stays keyed by index string.
fn restore_sequence(changes: BTreeMap<String, DiffNode>) -> DiffNode {
    if !is_contiguous_index(changes.keys()) {
        return DiffNode::Nested(changes);
    }
    let mut positioned: Vec<(usize, DiffNode)> = changes
        .into_iter()
        .filter_map(|(key, node)| key.parse::<usize>().ok().map(|index| (index, node)))
        .collect();
    positioned.sort_by_key(|(index, _)| *index);
    DiffNode::Sequence(positioned.into_iter().map(|(_, node)| node).collect())
}

/// A finished comparison between two trees.
///
/// Both the nested diff and its flattened form are computed once, at
/// construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Comparison {
    diff: Option<DiffNode>,
    flattened: Option<DiffNode>,
}

impl Comparison {
    /// Compare `old` against `new` and flatten the result.
    pub fn new(
        old: &Value,
        new: &Value,
        compare_options: &CompareOptions,
        flatten_options: &FlattenOptions,
    ) -> Self {
        let diff = compare(old, new, compare_options);
        let flattened = diff.as_ref().map(|node| flatten(node, flatten_options));
        Self { diff, flattened }
    }

    /// Like [`Comparison::new`], for documents that may be missing.
    pub fn of_documents(
        old: Option<&Value>,
        new: Option<&Value>,
        compare_options: &CompareOptions,
        flatten_options: &FlattenOptions,
    ) -> DiffResult<Self> {
        let old = old.ok_or(DiffError::MissingDocument(Side::Old))?;
        let new = new.ok_or(DiffError::MissingDocument(Side::New))?;
        Ok(Self::new(old, new, compare_options, flatten_options))
    }

    /// Returns `true` if anything changed.
    pub fn has_changes(&self) -> bool {
        self.diff.is_some()
    }

    /// The nested diff, or `None` if nothing changed.
    pub fn diff(&self) -> Option<&DiffNode> {
        self.diff.as_ref()
    }

    /// The flattened diff, or `None` if nothing changed.
    pub fn flattened(&self) -> Option<&DiffNode> {
        self.flattened.as_ref()
    }

    /// Consume the comparison, returning `(diff, flattened)`.
    pub fn into_parts(self) -> (Option<DiffNode>, Option<DiffNode>) {
        (self.diff, self.flattened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diff_json(old: Value, new: Value) -> Option<Value> {
        compare(&old, &new, &CompareOptions::default()).map(|d| serde_json::to_value(d).unwrap())
    }

    #[test]
    fn identical_trees_no_diff() {
        assert_eq!(diff_json(json!({"x": {"y": 1}}), json!({"x": {"y": 1}})), None);
        assert_eq!(diff_json(json!([1, 2, 3]), json!([1, 2, 3])), None);
        assert_eq!(diff_json(json!(null), json!(null)), None);
    }

    #[test]
    fn added_and_modified_keys() {
        let diff = diff_json(json!({"a": 1, "b": 2}), json!({"a": 1, "b": 3, "c": 4}));
        assert_eq!(
            diff,
            Some(json!({
                "b": {"action": "mod", "old": 2, "new": 3},
                "c": {"action": "add", "new": 4}
            }))
        );
    }

    #[test]
    fn deleted_key_carries_old_value() {
        let diff = diff_json(json!({"a": {"deep": true}, "b": 1}), json!({"b": 1}));
        assert_eq!(diff, Some(json!({"a": {"action": "del", "old": {"deep": true}}})));
    }

    #[test]
    fn reserved_keys_never_reported() {
        let diff = diff_json(json!({"_internal": 1, "keep": 1}), json!({"_internal": 2, "keep": 2}));
        assert_eq!(diff, Some(json!({"keep": {"action": "mod", "old": 1, "new": 2}})));
    }

    #[test]
    fn reserved_only_changes_are_absent() {
        let diff = diff_json(json!({"_ts": "2024-01-01", "a": 1}), json!({"_ts": "2024-02-01", "a": 1}));
        assert_eq!(diff, None);
        let nested = diff_json(json!({"cfg": {"_id": 1}}), json!({"cfg": {"_id": 2, "_rev": 3}}));
        assert_eq!(nested, None);
    }

    #[test]
    fn nested_mappings_recurse() {
        let diff = diff_json(
            json!({"db": {"host": "a", "port": 1}}),
            json!({"db": {"host": "b", "port": 1}}),
        );
        assert_eq!(diff, Some(json!({"db": {"host": {"action": "mod", "old": "a", "new": "b"}}})));
    }

    #[test]
    fn sequence_of_mappings_positional() {
        let diff = compare(&json!([{"a": 1}]), &json!([{"a": 2}]), &CompareOptions::default()).unwrap();
        let items = diff.as_sequence().expect("ordered sequence diff");
        assert_eq!(items.len(), 1);
        assert_eq!(
            items[0].get("a").and_then(DiffNode::as_entry),
            Some(&DiffEntry::Mod { old: json!(1), new: json!(2) })
        );
    }

    #[test]
    fn sequence_under_key_restored_to_list() {
        let diff = diff_json(json!({"tags": ["a", "b"]}), json!({"tags": ["x", "y"]}));
        assert_eq!(
            diff,
            Some(json!({"tags": [
                {"action": "mod", "old": "a", "new": "x"},
                {"action": "mod", "old": "b", "new": "y"}
            ]}))
        );
    }

    #[test]
    fn sparse_sequence_diff_stays_index_keyed() {
        let diff = diff_json(json!({"tags": ["a", "b"]}), json!({"tags": ["a", "c"]}));
        assert_eq!(diff, Some(json!({"tags": {"1": {"action": "mod", "old": "b", "new": "c"}}})));
    }

    #[test]
    fn sequence_growth_reports_added_positions() {
        let diff = diff_json(json!([1]), json!([1, 2, 3]));
        assert_eq!(
            diff,
            Some(json!({"1": {"action": "add", "new": 2}, "2": {"action": "add", "new": 3}}))
        );
        let shrink = diff_json(json!([1, 2]), json!([3]));
        assert_eq!(
            shrink,
            Some(json!([{"action": "mod", "old": 1, "new": 3}, {"action": "del", "old": 2}]))
        );
    }

    #[test]
    fn type_mismatch_is_scalar_mod() {
        let diff = diff_json(json!({"a": {"b": 1}}), json!({"a": 5}));
        assert_eq!(diff, Some(json!({"a": {"action": "mod", "old": {"b": 1}, "new": 5}})));
        let seq_vs_map = diff_json(json!({"a": [1]}), json!({"a": {"0": 1}}));
        assert_eq!(
            seq_vs_map,
            Some(json!({"a": {"action": "mod", "old": [1], "new": {"0": 1}}}))
        );
    }

    #[test]
    fn top_level_scalars_are_single_mod() {
        let diff = compare(&json!(1), &json!("1"), &CompareOptions::default());
        assert_eq!(diff, Some(DiffNode::Entry(DiffEntry::Mod { old: json!(1), new: json!("1") })));
    }

    #[test]
    fn caller_filter_applies_at_every_level() {
        let options = CompareOptions::with_filter(KeyFilter::suffix("_at").unwrap());
        let old = json!({"updated_at": 1, "cfg": {"seen_at": 1, "v": 1}});
        let new = json!({"updated_at": 2, "cfg": {"seen_at": 2, "v": 2}});
        let diff = compare(&old, &new, &options).map(|d| serde_json::to_value(d).unwrap());
        assert_eq!(diff, Some(json!({"cfg": {"v": {"action": "mod", "old": 1, "new": 2}}})));
    }

    #[test]
    fn missing_documents_rejected() {
        let doc = json!({"a": 1});
        let options = CompareOptions::default();
        assert!(matches!(
            compare_documents(None, Some(&doc), &options),
            Err(DiffError::MissingDocument(Side::Old))
        ));
        assert!(matches!(
            compare_documents(Some(&doc), None, &options),
            Err(DiffError::MissingDocument(Side::New))
        ));
        assert_eq!(compare_documents(Some(&doc), Some(&doc), &options).unwrap(), None);
    }

    #[test]
    fn comparison_holds_both_forms() {
        let cmp = Comparison::new(
            &json!({"a": {"b": 1}}),
            &json!({"a": {"b": 2}}),
            &CompareOptions::default(),
            &FlattenOptions::default(),
        );
        assert!(cmp.has_changes());
        assert_eq!(
            serde_json::to_value(cmp.flattened().unwrap()).unwrap(),
            json!({"a.b": {"action": "mod", "old": 1, "new": 2}})
        );

        let same = Comparison::new(
            &json!({"a": 1}),
            &json!({"a": 1}),
            &CompareOptions::default(),
            &FlattenOptions::default(),
        );
        assert!(!same.has_changes());
        assert_eq!(same.into_parts(), (None, None));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_json() -> impl Strategy<Value = Value> {
            let leaf = prop_oneof![
                Just(Value::Null),
                any::<bool>().prop_map(Value::from),
                any::<i64>().prop_map(Value::from),
                "[a-z]{0,6}".prop_map(Value::from),
            ];
            leaf.prop_recursive(4, 32, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                    prop::collection::btree_map("_?[a-z]{1,3}", inner, 0..4)
                        .prop_map(|m| Value::Object(m.into_iter().collect())),
                ]
            })
        }

        fn arb_object(keys: &'static str) -> impl Strategy<Value = Map<String, Value>> {
            prop::collection::btree_map(keys, arb_json(), 0..5).prop_map(|m| m.into_iter().collect())
        }

        proptest! {
            #[test]
            fn compare_is_reflexive(tree in arb_json()) {
                prop_assert_eq!(compare(&tree, &tree, &CompareOptions::default()), None);
            }

            #[test]
            fn reserved_segments_never_appear(old in arb_json(), new in arb_json()) {
                if let Some(diff) = compare(&old, &new, &CompareOptions::default()) {
                    for (path, _) in diff.entries("\u{1f}") {
                        let clean = path.split('\u{1f}').all(|segment| !segment.starts_with('_'));
                        prop_assert!(clean, "reserved segment in path {:?}", path);
                    }
                }
            }

            #[test]
            fn disjoint_keys_are_del_and_add(old in arb_object("a[a-z]{0,3}"), new in arb_object("b[a-z]{0,3}")) {
                let diff = compare(&Value::Object(old.clone()), &Value::Object(new.clone()), &CompareOptions::default());
                if old.is_empty() && new.is_empty() {
                    prop_assert_eq!(diff, None);
                } else {
                    let diff = diff.unwrap();
                    let changes = diff.as_nested().unwrap();
                    prop_assert_eq!(changes.len(), old.len() + new.len());
                    for key in old.keys() {
                        prop_assert_eq!(changes[key].as_entry().map(DiffEntry::action), Some("del"));
                    }
                    for key in new.keys() {
                        prop_assert_eq!(changes[key].as_entry().map(DiffEntry::action), Some("add"));
                    }
                }
            }
        }
    }
}
