//! Process-wide `tracing` subscriber.

use tracing_subscriber::EnvFilter;

/// Level used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber, filtered by `RUST_LOG`.
///
/// `json` selects one JSON object per line, which the cloud log viewer
/// parses into structured entries. Returns `false` if a subscriber was
/// already installed; calling this twice is harmless.
pub fn init(json: bool) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };
    if installed {
        tracing::debug!(json, "logging initialised");
    }
    installed
}
