//! Tracing subscriber setup.

use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Errors returned while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback level is not a valid filter directive.
    #[error("invalid log level '{level}': {reason}")]
    Level {
        /// Rejected directive.
        level: String,
        /// Parser message.
        reason: String,
    },

    /// A global subscriber is already installed.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Installs a JSON tracing subscriber as the global default.
///
/// `RUST_LOG` takes precedence over `level` when it is set and valid.
///
/// # Errors
///
/// Returns [`TelemetryError::Level`] for an invalid `level` and
/// [`TelemetryError::AlreadyInstalled`] when called more than once.
pub fn init_tracing(level: &str) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|err| TelemetryError::Level {
            level: level.to_owned(),
            reason: err.to_string(),
        })?;
    let layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_events(FmtSpan::CLOSE);

    Registry::default()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|err| TelemetryError::AlreadyInstalled(err.to_string()))
}
