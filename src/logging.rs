//! `tracing` subscriber setup

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{LogFormat, LoggingConfig};

/// Environment variable overriding the configured level filter
pub const LOG_ENV: &str = "TRANSIENT_TABLES_LOG";

/// Build the level filter: `$TRANSIENT_TABLES_LOG` wins over the config
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    filter_from(std::env::var(LOG_ENV).ok().as_deref(), config)
}

fn filter_from(directives: Option<&str>, config: &LoggingConfig) -> Result<EnvFilter> {
    match directives {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)
            .with_context(|| format!("Invalid {LOG_ENV} filter: {directives}")),
        _ => EnvFilter::try_new(&config.level)
            .with_context(|| format!("Invalid log level: {}", config.level)),
    }
}

/// Install a global subscriber writing to stderr.
///
/// Returns `Ok(false)` when a subscriber was already installed, so tests can
/// call this repeatedly.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = build_env_filter(config)?;
    let builder = fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Text => builder.with_target(false).try_init().is_ok(),
    };
    Ok(installed)
}
