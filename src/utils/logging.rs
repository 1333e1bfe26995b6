//! # Logging
//!
//! Structured logging setup for the gateway binary.
//!
//! The library itself only emits `tracing` events; installing a
//! subscriber is the binary's job so embedders keep control of their own
//! logging stack.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the configured default directive
/// applies. Calling twice is a no-op rather than a panic.
pub fn init(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .ok();
}
