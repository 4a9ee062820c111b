//! Logging initialization using the `tracing` crate.
//!
//! Diagnostics go to stderr so they never mix with the listing and caption
//! text printed on stdout. The level is controlled with `RUST_LOG`, e.g.
//! `RUST_LOG=cosmowall=debug`; by default only warnings are shown.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "warn";

/// Initializes the global tracing subscriber.
///
/// Call once at startup, before any logging occurs. Calling it again is
/// harmless; the first subscriber stays installed.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .try_init();
}
