//! Collapse a nested diff into a single mapping keyed by joined paths.

use std::collections::BTreeMap;

use tracing::warn;

use crate::entry::DiffNode;
use crate::error::{DiffError, DiffResult};
use crate::shape::index_keyed;

/// How a diff is flattened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlattenOptions {
    separator: String,
    expand_sequences: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            separator: ".".to_string(),
            expand_sequences: false,
        }
    }
}

impl FlattenOptions {
    /// Flatten with the given path separator.
    pub fn new(separator: &str) -> DiffResult<Self> {
        if separator.is_empty() {
            return Err(DiffError::InvalidSeparator(separator.to_string()));
        }
        Ok(Self {
            separator: separator.to_string(),
            ..Default::default()
        })
    }

    /// Also unpack sequence diffs, using their index as the path segment.
    pub fn expanding_sequences(mut self) -> Self {
        self.expand_sequences = true;
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn expands_sequences(&self) -> bool {
        self.expand_sequences
    }
}

/// Flatten a diff one nesting level at a time until no nested mapping is
/// left.
///
/// `{"a": {"b": e}}` becomes `{"a.b": e}`. Sequence diffs are left in place
/// unless [`FlattenOptions::expanding_sequences`] is set, in which case they
/// are keyed by index first. A bare entry, or a sequence when not expanding,
/// is returned unchanged. If two paths join to the same string the one
/// unpacked last wins and a warning reports how many changes were lost.
pub fn flatten(node: &DiffNode, options: &FlattenOptions) -> DiffNode {
    let (flat, collisions) = flatten_counting(node, options);
    if collisions > 0 {
        warn!(
            collisions,
            separator = %options.separator,
            "flattened paths collided, earlier changes overwritten"
        );
    }
    flat
}

/// Flatten and report how many changes were overwritten by a colliding path.
fn flatten_counting(node: &DiffNode, options: &FlattenOptions) -> (DiffNode, usize) {
    let mut current = match node {
        DiffNode::Nested(map) => map.clone(),
        DiffNode::Sequence(items) if options.expand_sequences => index_keyed(items.iter().cloned()),
        other => return (other.clone(), 0),
    };

    let mut collisions = 0;
    loop {
        let mut unpacked = false;
        let mut next = BTreeMap::new();
        for (key, value) in current {
            let children = match value {
                DiffNode::Nested(inner) => inner,
                DiffNode::Sequence(items) if options.expand_sequences => index_keyed(items),
                leaf => {
                    collisions += overwritten(next.insert(key, leaf));
                    continue;
                }
            };
            unpacked = true;
            for (inner_key, child) in children {
                let path = format!("{key}{}{inner_key}", options.separator);
                collisions += overwritten(next.insert(path, child));
            }
        }
        current = next;
        if !unpacked {
            return (DiffNode::Nested(current), collisions);
        }
    }
}

fn overwritten(previous: Option<DiffNode>) -> usize {
    previous.map_or(0, |node| node.len())
}
