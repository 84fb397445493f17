//! Logging setup for hosts and test harnesses.
//!
//! The engine only emits `tracing` events; installing a subscriber is left to
//! the application. [`init_logging`] is a convenience for the common case.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::TileError;

/// Filter used when neither `RUST_LOG` nor an explicit filter is given.
pub const DEFAULT_FILTER: &str = "info,tilecache=info";

/// Installs a global fmt subscriber.
///
/// `filter` takes precedence over `RUST_LOG`; with neither,
/// [`DEFAULT_FILTER`] applies.
///
/// # Errors
///
/// `SchemaConfiguration` if the filter does not parse or a global subscriber
/// is already installed.
pub fn init_logging(filter: Option<&str>) -> Result<(), TileError> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)
            .map_err(|e| TileError::config(format!("invalid log filter '{}': {}", directives, e)))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| TileError::config(format!("logging already initialized: {}", e)))
}
