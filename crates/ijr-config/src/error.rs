use std::path::PathBuf;

use ijr_diff::DiffError;
use ijr_secrets::SecretsError;
use ijr_store::StoreError;

/// Errors from loading settings and configuration documents.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    Secrets(#[from] SecretsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error("cannot parse settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An environment override held a value of the wrong type.
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: String, value: String },

    /// No configuration document exists for the function.
    #[error("no configuration for function {0:?}")]
    NotFound(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
