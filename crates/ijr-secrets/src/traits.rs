use crate::error::SecretsResult;
use crate::name::SecretVersionName;

/// Versioned secret manager.
///
/// Implementations must resolve [`SecretVersion::Latest`] to the newest
/// enabled version of the secret.
///
/// [`SecretVersion::Latest`]: crate::name::SecretVersion::Latest
pub trait SecretStore: Send + Sync {
    /// Return the raw payload of a secret version.
    ///
    /// Returns `Err(NotFound)` if the secret or version does not exist and
    /// `Err(Disabled)` if the version exists but cannot be accessed.
    fn access(&self, name: &SecretVersionName) -> SecretsResult<Vec<u8>>;
}

impl<S: SecretStore + ?Sized> SecretStore for std::sync::Arc<S> {
    fn access(&self, name: &SecretVersionName) -> SecretsResult<Vec<u8>> {
        (**self).access(name)
    }
}
