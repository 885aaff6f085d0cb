//! Tracing subscriber setup for binaries and tests embedding this crate.
//!
//! The library itself only *emits* `tracing` spans and events; installing a
//! subscriber is the embedder's decision. [`init`] is the batteries-included
//! version: `.env` loading, `RUST_LOG`-style filtering, and span-trace
//! capture for `miette` reports.

use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the default subscriber.
///
/// Reads filter directives from the environment (`RUST_LOG`, after loading a
/// `.env` file if present), falling back to `info`. Safe to call more than
/// once; later calls are no-ops, which keeps test binaries happy.
pub fn init() {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(ErrorLayer::default())
        .try_init();
}
