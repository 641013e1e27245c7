//! Diff result types.
//!
//! The serialized form mirrors the document shape callers store and log:
//! a [`DiffEntry`] is `{"action": "add"|"del"|"mod", "old": .., "new": ..}`
//! and a [`DiffNode`] is either such an entry, a mapping of key to node, or
//! an ordered list of nodes for diffs that originated inside a sequence.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single changed location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DiffEntry {
    /// The key only exists in the new tree.
    Add { new: Value },
    /// The key only exists in the old tree.
    Del { old: Value },
    /// The value at this location changed.
    Mod { old: Value, new: Value },
}

impl DiffEntry {
    /// The action label as it appears in the serialized form.
    pub fn action(&self) -> &'static str {
        match self {
            DiffEntry::Add { .. } => "add",
            DiffEntry::Del { .. } => "del",
            DiffEntry::Mod { .. } => "mod",
        }
    }

    /// The old value, if this entry carries one.
    pub fn old(&self) -> Option<&Value> {
        match self {
            DiffEntry::Del { old } | DiffEntry::Mod { old, .. } => Some(old),
            DiffEntry::Add { .. } => None,
        }
    }

    /// The new value, if this entry carries one.
    pub fn new_value(&self) -> Option<&Value> {
        match self {
            DiffEntry::Add { new } | DiffEntry::Mod { new, .. } => Some(new),
            DiffEntry::Del { .. } => None,
        }
    }
}

/// A structural diff, possibly nested.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiffNode {
    /// A change at this exact location.
    Entry(DiffEntry),
    /// Changes below an ordered sequence, by position.
    Sequence(Vec<DiffNode>),
    /// Changes below a mapping, by key.
    Nested(BTreeMap<String, DiffNode>),
}

impl From<DiffEntry> for DiffNode {
    fn from(entry: DiffEntry) -> Self {
        DiffNode::Entry(entry)
    }
}

impl DiffNode {
    pub fn as_entry(&self) -> Option<&DiffEntry> {
        match self {
            DiffNode::Entry(entry) => Some(entry),
            _ => None,
        }
    }

    pub fn as_nested(&self) -> Option<&BTreeMap<String, DiffNode>> {
        match self {
            DiffNode::Nested(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[DiffNode]> {
        match self {
            DiffNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a direct child by key, or by index string for sequences.
    pub fn get(&self, key: &str) -> Option<&DiffNode> {
        match self {
            DiffNode::Nested(map) => map.get(key),
            DiffNode::Sequence(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            DiffNode::Entry(_) => None,
        }
    }

    /// Every entry with its full path, segments joined by `separator`.
    ///
    /// Sequence positions appear as index segments. A bare entry at the root
    /// has the empty path.
    pub fn entries(&self, separator: &str) -> Vec<(String, &DiffEntry)> {
        let mut out = Vec::new();
        collect_entries(self, None, separator, &mut out);
        out
    }

    /// Number of added locations.
    pub fn additions(&self) -> usize {
        self.count(&|e| matches!(e, DiffEntry::Add { .. }))
    }

    /// Number of deleted locations.
    pub fn deletions(&self) -> usize {
        self.count(&|e| matches!(e, DiffEntry::Del { .. }))
    }

    /// Number of modified locations.
    pub fn modifications(&self) -> usize {
        self.count(&|e| matches!(e, DiffEntry::Mod { .. }))
    }

    /// Total number of changed locations.
    pub fn len(&self) -> usize {
        self.count(&|_| true)
    }

    /// Returns `true` if no location changed.
    ///
    /// `compare` never produces an empty node, but one can be deserialized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count(&self, pred: &dyn Fn(&DiffEntry) -> bool) -> usize {
        match self {
            DiffNode::Entry(entry) => usize::from(pred(entry)),
            DiffNode::Sequence(items) => items.iter().map(|n| n.count(pred)).sum(),
            DiffNode::Nested(map) => map.values().map(|n| n.count(pred)).sum(),
        }
    }
}

fn collect_entries<'a>(
    node: &'a DiffNode,
    path: Option<&str>,
    separator: &str,
    out: &mut Vec<(String, &'a DiffEntry)>,
) {
    let join = |segment: &str| match path {
        Some(prefix) => format!("{prefix}{separator}{segment}"),
        None => segment.to_string(),
    };
    match node {
        DiffNode::Entry(entry) => out.push((path.unwrap_or_default().to_string(), entry)),
        DiffNode::Sequence(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_entries(item, Some(&join(&index.to_string())), separator, out);
            }
        }
        DiffNode::Nested(map) => {
            for (key, child) in map {
                collect_entries(child, Some(&join(key)), separator, out);
            }
        }
    }
}
