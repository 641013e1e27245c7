//! Decoding secret payloads.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{SecretsError, SecretsResult};
use crate::name::{SecretVersion, SecretVersionName};
use crate::traits::SecretStore;

/// Environment variable naming the project in the serverless runtime.
pub const PROJECT_ENV: &str = "GCP_PROJECT";

/// The project named by `GCP_PROJECT`, falling back to `fallback`.
///
/// An empty variable counts as unset.
pub fn resolve_project(
    lookup: impl Fn(&str) -> Option<String>,
    fallback: Option<&str>,
) -> Option<String> {
    lookup(PROJECT_ENV)
        .filter(|project| !project.is_empty())
        .or_else(|| fallback.map(str::to_string))
}

/// Secret getter bound to one project.
///
/// Payloads are UTF-8 JSON documents. A missing version means `latest`.
#[derive(Debug)]
pub struct Secrets<S> {
    project_id: String,
    store: S,
}

impl<S: SecretStore> Secrets<S> {
    /// Bind to the project from `GCP_PROJECT`, falling back to `project_id`.
    pub fn new(store: S, project_id: Option<&str>) -> SecretsResult<Self> {
        Self::from_lookup(store, |key| std::env::var(key).ok(), project_id)
    }

    /// Like [`Secrets::new`], reading variables through `lookup`.
    pub fn from_lookup(
        store: S,
        lookup: impl Fn(&str) -> Option<String>,
        project_id: Option<&str>,
    ) -> SecretsResult<Self> {
        let project_id = resolve_project(lookup, project_id).ok_or(SecretsError::MissingProject)?;
        Ok(Self::with_project(store, project_id))
    }

    /// Bind to an explicit project, ignoring the environment.
    pub fn with_project(store: S, project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            store,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The full resource name of a secret version.
    pub fn version_name(
        &self,
        secret_id: &str,
        version: Option<SecretVersion>,
    ) -> SecretVersionName {
        SecretVersionName::new(&self.project_id, secret_id, version.unwrap_or_default())
    }

    /// Fetch a secret and decode it as a JSON mapping.
    pub fn dict_secret(
        &self,
        secret_id: &str,
        version: Option<SecretVersion>,
    ) -> SecretsResult<Map<String, Value>> {
        let name = self.version_name(secret_id, version);
        match self.decode::<Value>(&name)? {
            Value::Object(map) => Ok(map),
            _ => Err(SecretsError::NotAMapping {
                name: name.to_string(),
            }),
        }
    }

    /// Fetch a secret and deserialize it into `T`.
    pub fn typed_secret<T: DeserializeOwned>(
        &self,
        secret_id: &str,
        version: Option<SecretVersion>,
    ) -> SecretsResult<T> {
        self.decode(&self.version_name(secret_id, version))
    }

    fn decode<T: DeserializeOwned>(&self, name: &SecretVersionName) -> SecretsResult<T> {
        let payload = self.store.access(name)?;
        debug!(secret = %name, bytes = payload.len(), "secret accessed");
        let text = std::str::from_utf8(&payload).map_err(|_| SecretsError::InvalidUtf8 {
            name: name.to_string(),
        })?;
        serde_json::from_str(text).map_err(|source| SecretsError::Decode {
            name: name.to_string(),
            source,
        })
    }
}
