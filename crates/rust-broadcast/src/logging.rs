//! Subscriber setup for applications embedding the engine.
//!
//! The library itself only emits `tracing` events. Binaries that want those
//! events on stderr can call [`init`] once at startup.
//!
//! ```rust,no_run
//! use rust_broadcast::config::{LogFormat, LoggingConfig};
//!
//! rust_broadcast::logging::init(&LoggingConfig::new().format(LogFormat::Json))?;
//! # Ok::<(), rust_broadcast::BroadcastError>(())
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{BroadcastError, Result};

/// Build the filter for `config`. `RUST_LOG` wins when it is set and valid.
///
/// # Errors
///
/// Returns [`BroadcastError::Config`] if `config.level` is not a valid
/// filter directive.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| BroadcastError::config(format!("invalid log level {:?}: {e}", config.level)))
}

/// Install a global subscriber.
///
/// # Errors
///
/// Returns [`BroadcastError::Config`] if the filter directive is invalid or
/// a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(config.ansi),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_target(true)
                    .with_ansi(config.ansi),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init(),
    };

    installed.map_err(|e| BroadcastError::config(format!("logging already initialized: {e}")))
}
