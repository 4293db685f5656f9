//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with the default `info` filter (overridable via
/// `RUST_LOG`).
///
/// Safe to call multiple times (subsequent calls are no-ops), so tests and
/// the embedding app can both call it freely.
pub fn init() {
    init_with_filter("info");
}

/// Initialize tracing with an explicit default filter directive.
pub fn init_with_filter(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
