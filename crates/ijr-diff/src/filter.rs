//! Key exclusion rules.
//!
//! Keys starting with [`RESERVED_PREFIX`] are internal fields (`_id`, `_ts`,
//! ...) and are always dropped before comparison. A [`KeyFilter`] can drop
//! further keys by prefix, by suffix, or by both at once.

use crate::error::{DiffError, DiffResult};

/// Prefix marking reserved keys that never take part in a comparison.
pub const RESERVED_PREFIX: char = '_';

/// Caller-supplied exclusion rule.
///
/// With only a prefix or only a suffix, a key matching it is dropped. With
/// both, a key must match both to be dropped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyFilter {
    prefix: Option<String>,
    suffix: Option<String>,
}

impl KeyFilter {
    /// A filter that only drops reserved keys.
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a filter, rejecting empty patterns.
    ///
    /// An empty pattern would match every key and silently turn every
    /// comparison into "no changes".
    pub fn new(prefix: Option<&str>, suffix: Option<&str>) -> DiffResult<Self> {
        Ok(Self {
            prefix: validate("prefix", prefix)?,
            suffix: validate("suffix", suffix)?,
        })
    }

    /// Drop keys starting with `prefix`.
    pub fn prefix(prefix: &str) -> DiffResult<Self> {
        Self::new(Some(prefix), None)
    }

    /// Drop keys ending with `suffix`.
    pub fn suffix(suffix: &str) -> DiffResult<Self> {
        Self::new(None, Some(suffix))
    }

    /// Returns `true` if `key` takes part in the comparison.
    pub fn keeps(&self, key: &str) -> bool {
        !self.excludes(key)
    }

    /// Returns `true` if `key` is dropped from the comparison.
    pub fn excludes(&self, key: &str) -> bool {
        if key.starts_with(RESERVED_PREFIX) {
            return true;
        }
        match (&self.prefix, &self.suffix) {
            (Some(prefix), Some(suffix)) => {
                key.starts_with(prefix.as_str()) && key.ends_with(suffix.as_str())
            }
            (Some(prefix), None) => key.starts_with(prefix.as_str()),
            (None, Some(suffix)) => key.ends_with(suffix.as_str()),
            (None, None) => false,
        }
    }
}

fn validate(field: &'static str, pattern: Option<&str>) -> DiffResult<Option<String>> {
    match pattern {
        Some("") => Err(DiffError::InvalidFilter {
            field,
            reason: "pattern must not be empty".into(),
        }),
        Some(p) => Ok(Some(p.to_string())),
        None => Ok(None),
    }
}
