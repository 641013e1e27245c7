//! Document store access for serverless functions.
//!
//! Wraps a document database behind the [`DocumentStore`] trait and adds the
//! two helpers functions use day to day:
//!
//! - [`DocumentWriter`] -- buffers inserts, keyed upserts and updates for one
//!   collection and sends them as bulk writes once a threshold is exceeded
//! - [`DocumentReader`] -- find, aggregate and collection listing
//!
//! Every written document is stamped with `_ts`; keyed writes also set
//! `_id`. Both are reserved fields that change detection ignores.
//!
//! # Backends
//!
//! - [`InMemoryDocumentStore`] / [`InMemoryConnector`] -- for tests and
//!   local runs; the wire protocol of a real database is the backend's
//!   concern.

pub mod credentials;
pub mod error;
pub mod memory;
pub mod ops;
pub mod query;
pub mod reader;
pub mod traits;
pub mod writer;

pub use credentials::StoreCredentials;
pub use error::{StoreError, StoreResult};
pub use memory::{InMemoryConnection, InMemoryConnector, InMemoryDocumentStore};
pub use ops::{BulkWriteSummary, Document, FindQuery, SortOrder, WriteOp};
pub use reader::DocumentReader;
pub use traits::{DocumentStore, StoreConnector};
pub use writer::{DocumentWriter, DEFAULT_WRITE_THRESHOLD, ID_FIELD, TIMESTAMP_FIELD};
