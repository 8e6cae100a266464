//! Tracing bootstrap for host applications.

use crate::error::{GeodashError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "geodash=info";

/// Install a global fmt subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// Returns an error instead of panicking when a subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .map_err(|e| GeodashError::ConfigInvalid {
            key: "tracing".to_string(),
            reason: e.to_string(),
        })
}
