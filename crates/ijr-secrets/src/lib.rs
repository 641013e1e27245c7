//! Secret manager access for serverless functions.
//!
//! Secrets are stored as versioned JSON payloads. This crate resolves a
//! secret id and optional version (default `latest`) to a full resource name,
//! fetches the payload through a [`SecretStore`] and decodes it into a JSON
//! mapping or a typed struct.
//!
//! # Backends
//!
//! - [`InMemorySecretStore`] -- `HashMap`-based store for tests and local runs
//!
//! Cloud authentication is the backend's concern; this crate only sees the
//! [`SecretStore`] trait.

pub mod error;
pub mod memory;
pub mod name;
pub mod secrets;
pub mod traits;

pub use error::{SecretsError, SecretsResult};
pub use memory::InMemorySecretStore;
pub use name::{SecretVersion, SecretVersionName};
pub use secrets::{resolve_project, Secrets, PROJECT_ENV};
pub use traits::SecretStore;
