//! Tracing subscriber setup for binaries

use tracing_subscriber::EnvFilter;

/// Install the global subscriber
///
/// Honors `RUST_LOG`, defaulting to `info`. With `json` set, events are
/// written as JSON lines. A second call is a no-op.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
