//! Tracing subscriber setup for hosts that do not install their own.

use cosim_config::LoggingConfig;
use tracing_subscriber::EnvFilter;

use crate::error::{BackendError, BackendResult};

/// Parses an `EnvFilter` directive string.
pub fn build_filter(directives: &str) -> BackendResult<EnvFilter> {
    EnvFilter::try_new(directives).map_err(|e| BackendError::InvalidFilter {
        filter: directives.to_string(),
        reason: e.to_string(),
    })
}

/// Installs a global `fmt` subscriber.
///
/// `RUST_LOG` takes precedence over `config.filter` when set.
pub fn init_tracing(config: &LoggingConfig) -> BackendResult<()> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(directives) if !directives.trim().is_empty() => build_filter(&directives)?,
        _ => build_filter(&config.filter)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .try_init()
        .map_err(|e| BackendError::Tracing(e.to_string()))
}
