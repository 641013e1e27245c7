//! Queries and write operations.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored document.
pub type Document = Map<String, Value>;

/// Sort direction for a field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Read a `1` / `-1` sort spec value.
    pub fn from_spec(value: &Value) -> Option<Self> {
        match value.as_i64()? {
            1 => Some(SortOrder::Ascending),
            -1 => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

/// A find query: filter, sort, limit and projection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    pub filter: Document,
    pub sort: Vec<(String, SortOrder)>,
    /// Zero or negative means no limit.
    pub limit: i64,
    /// Fields to return. `_id` is always returned.
    pub projection: Option<Vec<String>>,
}

impl FindQuery {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// Match every document.
    pub fn all() -> Self {
        Self::default()
    }

    /// Match documents whose `field` equals `value`.
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        let mut filter = Document::new();
        filter.insert(field.to_string(), value.into());
        Self::new(filter)
    }

    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort.push((field.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// The limit as a count, or `None` if unlimited.
    pub fn effective_limit(&self) -> Option<usize> {
        (self.limit > 0).then_some(self.limit as usize)
    }
}

/// One operation in a bulk write.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOp {
    InsertOne {
        document: Document,
    },
    ReplaceOne {
        filter: Document,
        replacement: Document,
        upsert: bool,
    },
    UpdateOne {
        filter: Document,
        update: Document,
        upsert: bool,
    },
    UpdateMany {
        filter: Document,
        update: Document,
    },
}

impl WriteOp {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WriteOp::InsertOne { .. } => "insert_one",
            WriteOp::ReplaceOne { .. } => "replace_one",
            WriteOp::UpdateOne { .. } => "update_one",
            WriteOp::UpdateMany { .. } => "update_many",
        }
    }
}

/// Counts reported by a bulk write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkWriteSummary {
    pub inserted: u64,
    pub matched: u64,
    pub modified: u64,
    pub upserted: u64,
}

impl BulkWriteSummary {
    /// Total documents touched.
    pub fn touched(&self) -> u64 {
        self.inserted + self.modified + self.upserted
    }
}

impl AddAssign for BulkWriteSummary {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.matched += other.matched;
        self.modified += other.modified;
        self.upserted += other.upserted;
    }
}
