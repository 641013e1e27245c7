//! Error types for the diff crate.

/// Which side of a comparison an argument belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Old,
    New,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Old => f.write_str("old"),
            Side::New => f.write_str("new"),
        }
    }
}

/// Errors raised at the boundary of a diff operation.
///
/// Comparison itself never fails on tree-shaped input; these errors only
/// reject malformed arguments before any traversal starts.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// A document was required on one side but none was supplied.
    #[error("missing {0} document: nothing to compare against")]
    MissingDocument(Side),

    /// A key exclusion rule was malformed.
    #[error("invalid key filter {field}: {reason}")]
    InvalidFilter {
        field: &'static str,
        reason: String,
    },

    /// The flatten separator was malformed.
    #[error("invalid separator {0:?}: must be non-empty")]
    InvalidSeparator(String),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
