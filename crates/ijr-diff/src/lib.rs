//! Structural diff for JSON documents.
//!
//! Compares two decoded documents and reports every addition, deletion and
//! modification at every nesting level. Used for change detection before
//! writing an updated record, logging a change or raising an alert.
//!
//! # Key Types
//!
//! - [`DiffEntry`] / [`DiffNode`] -- a single change / a nested diff
//! - [`KeyFilter`] -- prefix/suffix key exclusion (reserved `_` keys always excluded)
//! - [`Comparison`] -- a finished comparison holding the nested and flattened diff
//!
//! # Example
//!
//! ```
//! use ijr_diff::{compare, flatten, CompareOptions, FlattenOptions};
//! use serde_json::json;
//!
//! let old = json!({"db": {"host": "a"}, "_ts": 1});
//! let new = json!({"db": {"host": "b"}, "_ts": 2});
//! let diff = compare(&old, &new, &CompareOptions::default()).unwrap();
//! let flat = flatten(&diff, &FlattenOptions::default());
//! assert_eq!(
//!     serde_json::to_value(flat).unwrap(),
//!     json!({"db.host": {"action": "mod", "old": "a", "new": "b"}})
//! );
//! ```

pub mod compare;
pub mod entry;
pub mod error;
pub mod filter;
pub mod flatten;
pub mod legacy;
pub mod shape;

pub use compare::{compare, compare_documents, CompareOptions, Comparison};
pub use entry::{DiffEntry, DiffNode};
pub use error::{DiffError, DiffResult, Side};
pub use filter::{KeyFilter, RESERVED_PREFIX};
pub use flatten::{flatten, FlattenOptions};
pub use legacy::dict_compare;
pub use shape::Shape;
