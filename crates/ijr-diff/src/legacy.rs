//! Mapping-only comparison producing dotted paths directly.
//!
//! Older callers store change logs keyed by dotted path and expect lists to
//! be reported as whole values. This comparison only descends into pairs of
//! mappings, never into sequences, always drops reserved keys and joins
//! nested keys with `.` as it goes.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::entry::DiffEntry;
use crate::filter::RESERVED_PREFIX;

/// Compare two mappings, returning changes keyed by dotted path.
///
/// Returns `None` when nothing outside reserved keys changed.
pub fn dict_compare(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
) -> Option<BTreeMap<String, DiffEntry>> {
    let mut changes = BTreeMap::new();
    collect(old, new, None, &mut changes);
    (!changes.is_empty()).then_some(changes)
}

fn collect(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    nested: Option<&str>,
    changes: &mut BTreeMap<String, DiffEntry>,
) {
    let path = |key: &str| match nested {
        Some(prefix) => format!("{prefix}.{key}"),
        None => key.to_string(),
    };
    let reserved = |key: &str| key.starts_with(RESERVED_PREFIX);

    for (key, old_val) in old.iter().filter(|(k, _)| !reserved(k.as_str())) {
        match (old_val, new.get(key)) {
            (Value::Object(old_map), Some(Value::Object(new_map))) => {
                collect(old_map, new_map, Some(&path(key)), changes);
            }
            (_, Some(new_val)) if old_val != new_val => {
                changes.insert(
                    path(key),
                    DiffEntry::Mod {
                        old: old_val.clone(),
                        new: new_val.clone(),
                    },
                );
            }
            (_, Some(_)) => {}
            (_, None) => {
                changes.insert(path(key), DiffEntry::Del { old: old_val.clone() });
            }
        }
    }

    for (key, new_val) in new.iter().filter(|(k, _)| !reserved(k.as_str())) {
        if !old.contains_key(key) {
            changes.insert(path(key), DiffEntry::Add { new: new_val.clone() });
        }
    }
}
