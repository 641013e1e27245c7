//! Settings and configuration documents for serverless functions.
//!
//! - [`Settings`] -- project-wide settings from TOML with `IJR_*`
//!   environment overrides
//! - [`runtime`] -- detection of the deployed function runtime
//! - [`logging::init`] -- the process-wide `tracing` subscriber
//! - [`ConfigLoader`] -- per-function configuration documents, rewritten
//!   only when the diff engine reports a change

pub mod error;
pub mod loader;
pub mod logging;
pub mod runtime;
pub mod settings;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, FUNCTION_FIELD};
pub use settings::{Settings, ENV_PREFIX};
