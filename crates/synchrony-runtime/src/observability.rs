//! Logging initialisation

use tracing_subscriber::EnvFilter;

use synchrony_core::{SynchronyError, SynchronyResult};

use crate::{LogFormat, LoggingConfig};

/// Install the global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over `config.default_directive`. Fails instead
/// of panicking when a subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> SynchronyResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.default_directive)
            .map_err(|e| SynchronyError::Logging(e.to_string()))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match config.format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| SynchronyError::Logging(e.to_string()))
}
