/// Errors from message bus operations.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// A message or envelope could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The bus rejected or failed to deliver a publish.
    #[error("publish to {topic} failed: {reason}")]
    Publish { topic: String, reason: String },

    /// The bus cannot be reached.
    #[error("message bus unavailable: {0}")]
    Unavailable(String),
}

/// Result alias for bus operations.
pub type BusResult<T> = Result<T, BusError>;
