//! Tracing initialisation helper
//!
//! Binaries embedding this crate call [`init`] once at startup; libraries
//! and tests leave the subscriber to the host application.

use tracing_subscriber::EnvFilter;

/// Install a formatted tracing subscriber honouring `RUST_LOG`
///
/// Falls back to `info` when `RUST_LOG` is unset. Safe to call more than
/// once; later calls are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
