//! Serverless runtime detection.

use std::env;

use ijr_secrets::resolve_project;
pub use ijr_secrets::PROJECT_ENV;

/// Set by the runtime in every deployed function.
pub const FUNCTION_NAME_ENV: &str = "X_GOOGLE_FUNCTION_NAME";

/// Returns `true` when running inside a deployed cloud function.
pub fn running_in_cloud_function() -> bool {
    env::var_os(FUNCTION_NAME_ENV).is_some()
}

/// Name of the deployed function, if any.
pub fn function_name() -> Option<String> {
    function_name_from(|key| env::var(key).ok())
}

/// Project id from the environment, falling back to `fallback`.
pub fn project_id(fallback: Option<&str>) -> Option<String> {
    resolve_project(|key| env::var(key).ok(), fallback)
}

pub(crate) fn function_name_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    lookup(FUNCTION_NAME_ENV).filter(|name| !name.is_empty())
}
