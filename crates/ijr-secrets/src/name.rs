//! Secret version naming.
//!
//! A secret version is addressed as
//! `projects/{project}/secrets/{secret}/versions/{version}` where the version
//! is a number starting at 1 or the alias `latest`.

use std::fmt;
use std::str::FromStr;

use crate::error::{SecretsError, SecretsResult};

/// Alias resolving to the newest enabled version.
pub const LATEST: &str = "latest";

/// A secret version: a specific number or the newest one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SecretVersion {
    #[default]
    Latest,
    Number(u32),
}

impl FromStr for SecretVersion {
    type Err = SecretsError;

    fn from_str(s: &str) -> SecretsResult<Self> {
        if s == LATEST {
            return Ok(SecretVersion::Latest);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(SecretVersion::Number(n)),
            _ => Err(SecretsError::InvalidVersion(s.to_string())),
        }
    }
}

impl fmt::Display for SecretVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretVersion::Latest => f.write_str(LATEST),
            SecretVersion::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Fully qualified name of a secret version.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretVersionName {
    pub project: String,
    pub secret: String,
    pub version: SecretVersion,
}

impl SecretVersionName {
    pub fn new(
        project: impl Into<String>,
        secret: impl Into<String>,
        version: SecretVersion,
    ) -> Self {
        Self {
            project: project.into(),
            secret: secret.into(),
            version,
        }
    }

    /// The same secret at a different version.
    pub fn at(&self, version: SecretVersion) -> Self {
        Self {
            version,
            ..self.clone()
        }
    }
}

impl fmt::Display for SecretVersionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "projects/{}/secrets/{}/versions/{}",
            self.project, self.secret, self.version
        )
    }
}
