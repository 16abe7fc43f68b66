//! Logging setup
//!
//! The library only emits `tracing` events. Installing a subscriber is left to
//! the embedding process, which can call [`init`] once at startup.

use crate::config::{LogFormat, LoggingConfig};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the level filter. `RUST_LOG` wins over the configured level.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, tracing_subscriber::filter::ParseError> {
    EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))
}

/// Initialize global logging with configuration
pub fn init(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let registry = tracing_subscriber::registry().with(env_filter(config)?);

    match config.format {
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_current_span(false)
                .with_thread_ids(true);

            registry.with(fmt_layer).try_init()?;
        }
        LogFormat::Human => {
            let fmt_layer = fmt::layer().with_target(true).with_thread_ids(true);

            registry.with(fmt_layer).try_init()?;
        }
    }

    info!(
        level = %config.level,
        format = ?config.format,
        "Logging system initialized"
    );

    Ok(())
}
