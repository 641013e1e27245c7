//! Tagged view over the shape of a JSON value.
//!
//! Comparison dispatches on the pair of shapes: two Mappings recurse, two
//! Sequences are normalized to index-keyed Mappings and recurse, and every
//! other combination (including mismatched shapes) falls back to equality.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// The structural shape of a tree value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape<'a> {
    /// A JSON object.
    Mapping(&'a Map<String, Value>),
    /// A JSON array. Order is significant.
    Sequence(&'a [Value]),
    /// Any leaf value: string, number, boolean or null.
    Scalar(&'a Value),
}

impl<'a> Shape<'a> {
    /// Classify a value by its shape.
    pub fn of(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => Shape::Mapping(map),
            Value::Array(items) => Shape::Sequence(items),
            other => Shape::Scalar(other),
        }
    }

    /// Returns `true` if the value can be iterated by key.
    pub fn is_mapping(&self) -> bool {
        matches!(self, Shape::Mapping(_))
    }

    /// Returns `true` if the value is an ordered sequence.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Shape::Sequence(_))
    }
}

/// Key a sequence by zero-based index string so elements are compared
/// positionally.
pub fn index_keyed<T>(items: impl IntoIterator<Item = T>) -> BTreeMap<String, T> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| (index.to_string(), item))
        .collect()
}

/// Returns `true` if the keys are exactly `"0"`, `"1"`, ..., `"n-1"`.
///
/// An empty key set is not a sequence.
pub fn is_contiguous_index<'k>(keys: impl IntoIterator<Item = &'k String>) -> bool {
    let mut indices: Vec<usize> = Vec::new();
    for key in keys {
        // Reject forms like "01" or "+1" that parse but are not canonical.
        match key.parse::<usize>() {
            Ok(index) if index.to_string() == *key => indices.push(index),
            _ => return false,
        }
    }
    if indices.is_empty() {
        return false;
    }
    indices.sort_unstable();
    indices.iter().enumerate().all(|(expected, index)| expected == *index)
}
