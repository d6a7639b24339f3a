//! Logging setup.
//!
//! Levels follow the error taxonomy of the request path: malformed client
//! requests log at `debug` (they are common background noise), rejected
//! authentications at `info`, backend degradation at `warn`/`error`.
use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Initializes the global tracing subscriber once. The filter comes from
/// `RUST_LOG`, defaulting to `info`.
pub fn setup() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::fmt().with_env_filter(filter).init();

        tracing::info!("logging initialized");
    });
}
