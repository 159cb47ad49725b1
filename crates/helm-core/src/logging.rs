//! Tracing subscriber setup.
//!
//! Called once from the server binary. Library crates only emit `tracing`
//! events and never install a subscriber themselves.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Install the global tracing subscriber.
///
/// Filter comes from `RUST_LOG` when set, otherwise `info` with helm crates
/// at `debug`. Set `json = true` for machine-readable output (deployments).
pub fn init(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,helm_core=debug,helm_providers=debug,helm_runtime=debug,helm_store=debug,helm_server=debug"));

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
