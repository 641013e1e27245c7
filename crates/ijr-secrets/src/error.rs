//! Error types for secret access.

/// Errors from secret store operations.
#[derive(Debug, thiserror::Error)]
pub enum SecretsError {
    /// The secret or the requested version does not exist.
    #[error("secret not found: {0}")]
    NotFound(String),

    /// The requested version exists but has been disabled.
    #[error("secret version is disabled: {0}")]
    Disabled(String),

    /// A version string was neither `latest` nor a positive number.
    #[error("invalid secret version {0:?}: expected \"latest\" or a positive number")]
    InvalidVersion(String),

    /// The payload was not valid UTF-8.
    #[error("secret payload for {name} is not valid UTF-8")]
    InvalidUtf8 { name: String },

    /// The payload could not be decoded.
    #[error("cannot decode secret payload for {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// The payload decoded to something other than a JSON object.
    #[error("secret payload for {name} is not a mapping")]
    NotAMapping { name: String },

    /// No project id was configured or found in the environment.
    #[error("no project id: set GCP_PROJECT or pass one explicitly")]
    MissingProject,

    /// The backing secret manager failed.
    #[error("secret backend error: {0}")]
    Backend(String),
}

/// Result alias for secret operations.
pub type SecretsResult<T> = Result<T, SecretsError>;
