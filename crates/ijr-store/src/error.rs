/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store connection has been closed.
    #[error("document store connection is closed")]
    Closed,

    /// The credentials were rejected.
    #[error("authentication failed for user {user}")]
    Auth { user: String },

    /// An insert collided with an existing `_id`.
    #[error("duplicate key {id} in {namespace}")]
    DuplicateKey { namespace: String, id: String },

    /// A query, update or pipeline stage the backend cannot evaluate.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// A malformed query, update or write operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// A document could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The backing database failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
