use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{SecretsError, SecretsResult};
use crate::name::{SecretVersion, SecretVersionName};
use crate::traits::SecretStore;

#[derive(Clone, Debug)]
struct StoredVersion {
    payload: Vec<u8>,
    enabled: bool,
}

/// In-memory secret manager for tests and local runs.
///
/// Versions are numbered from 1 per `(project, secret)` in the order they
/// are added.
pub struct InMemorySecretStore {
    secrets: RwLock<HashMap<(String, String), Vec<StoredVersion>>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self {
            secrets: RwLock::new(HashMap::new()),
        }
    }

    /// Add a new version and return its number.
    pub fn add_version(&self, project: &str, secret: &str, payload: impl Into<Vec<u8>>) -> u32 {
        let mut map = self.secrets.write().expect("lock poisoned");
        let versions = map
            .entry((project.to_string(), secret.to_string()))
            .or_default();
        versions.push(StoredVersion {
            payload: payload.into(),
            enabled: true,
        });
        versions.len() as u32
    }

    /// Disable a version. Returns `false` if it does not exist.
    pub fn disable_version(&self, project: &str, secret: &str, version: u32) -> bool {
        let mut map = self.secrets.write().expect("lock poisoned");
        let slot = map
            .get_mut(&(project.to_string(), secret.to_string()))
            .and_then(|versions| versions.get_mut(index_of(version)?));
        match slot {
            Some(stored) => {
                stored.enabled = false;
                true
            }
            None => false,
        }
    }

    /// Number of secrets (not versions) held.
    pub fn len(&self) -> usize {
        self.secrets.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySecretStore {
    fn default() -> Self {
        Self::new()
    }
}

fn index_of(version: u32) -> Option<usize> {
    (version as usize).checked_sub(1)
}

impl SecretStore for InMemorySecretStore {
    fn access(&self, name: &SecretVersionName) -> SecretsResult<Vec<u8>> {
        let map = self.secrets.read().expect("lock poisoned");
        let versions = map
            .get(&(name.project.clone(), name.secret.clone()))
            .ok_or_else(|| SecretsError::NotFound(name.to_string()))?;

        let stored = match name.version {
            SecretVersion::Latest => versions
                .iter()
                .rev()
                .find(|v| v.enabled)
                .ok_or_else(|| SecretsError::NotFound(name.to_string()))?,
            SecretVersion::Number(n) => {
                let stored = index_of(n)
                    .and_then(|i| versions.get(i))
                    .ok_or_else(|| SecretsError::NotFound(name.to_string()))?;
                if !stored.enabled {
                    return Err(SecretsError::Disabled(name.to_string()));
                }
                stored
            }
        };
        Ok(stored.payload.clone())
    }
}

impl std::fmt::Debug for InMemorySecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemorySecretStore")
            .field("secret_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(version: SecretVersion) -> SecretVersionName {
        SecretVersionName::new("proj", "db", version)
    }

    #[test]
    fn versions_numbered_from_one() {
        let store = InMemorySecretStore::new();
        assert_eq!(store.add_version("proj", "db", "v1"), 1);
        assert_eq!(store.add_version("proj", "db", "v2"), 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.access(&name(SecretVersion::Number(1))).unwrap(), b"v1");
    }

    #[test]
    fn latest_resolves_to_newest_enabled() {
        let store = InMemorySecretStore::new();
        store.add_version("proj", "db", "v1");
        store.add_version("proj", "db", "v2");
        assert_eq!(store.access(&name(SecretVersion::Latest)).unwrap(), b"v2");

        assert!(store.disable_version("proj", "db", 2));
        assert_eq!(store.access(&name(SecretVersion::Latest)).unwrap(), b"v1");
        assert!(matches!(
            store.access(&name(SecretVersion::Number(2))),
            Err(SecretsError::Disabled(_))
        ));
    }

    #[test]
    fn missing_secret_or_version() {
        let store = InMemorySecretStore::new();
        assert!(matches!(
            store.access(&name(SecretVersion::Latest)),
            Err(SecretsError::NotFound(_))
        ));
        store.add_version("proj", "db", "v1");
        assert!(matches!(
            store.access(&name(SecretVersion::Number(7))),
            Err(SecretsError::NotFound(_))
        ));
        assert!(!store.disable_version("proj", "db", 0));
    }

    #[test]
    fn all_disabled_latest_not_found() {
        let store = InMemorySecretStore::new();
        store.add_version("proj", "db", "v1");
        store.disable_version("proj", "db", 1);
        assert!(matches!(
            store.access(&name(SecretVersion::Latest)),
            Err(SecretsError::NotFound(_))
        ));
    }
}
