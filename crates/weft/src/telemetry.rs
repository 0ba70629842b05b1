//! Tracing output for weft programs.
//!
//! A weft program's standard output belongs to its commands, so every event
//! is written to standard error. [`initialise`] reads the filter and format
//! from a [`TelemetryConfig`] (usually loaded from `WEFT_LOG_FILTER` and
//! `WEFT_LOG_FORMAT`). The engine's own events use the `weft::tree` and
//! `weft::dispatch` targets, so `WEFT_LOG_FILTER=weft=debug` traces command
//! binding without touching the embedding program's levels.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, debug, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use weft_config::TelemetryConfig;

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Proof that the process-wide subscriber is in place.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Failures while installing the tracing subscriber.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// The filter expression did not parse.
    #[error("invalid log filter '{filter}': {reason}")]
    Filter {
        /// Expression as configured.
        filter: String,
        /// Parser message.
        reason: String,
    },
    /// Some other subscriber already owns the global default.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}

/// Installs the stderr subscriber once per process.
///
/// The first successful call wins; later calls return a handle and ignore
/// their configuration.
///
/// ```
/// use weft::telemetry;
/// use weft_config::TelemetryConfig;
///
/// # fn main() -> Result<(), weft::telemetry::TelemetryError> {
/// let config = TelemetryConfig::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop((first, second));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for an invalid filter expression and
/// [`TelemetryError::Subscriber`] when another subscriber is already the
/// global default.
pub fn initialise(config: &TelemetryConfig) -> Result<TelemetryHandle, TelemetryError> {
    INSTALLED.get_or_try_init(|| {
        tracing::subscriber::set_global_default(stderr_subscriber(config)?)?;
        debug!(
            filter = config.log_filter(),
            format = %config.log_format(),
            "telemetry installed"
        );
        Ok::<_, TelemetryError>(())
    })?;
    Ok(TelemetryHandle)
}

fn stderr_subscriber(
    config: &TelemetryConfig,
) -> Result<Box<dyn Subscriber + Send + Sync>, TelemetryError> {
    let filter =
        EnvFilter::try_new(config.log_filter()).map_err(|error| TelemetryError::Filter {
            filter: config.log_filter().to_owned(),
            reason: error.to_string(),
        })?;
    let events = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());
    if config.log_format().is_structured() {
        Ok(Box::new(events.json().flatten_event(true).finish()))
    } else {
        Ok(Box::new(events.compact().finish()))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use weft_config::LogFormat;

    use super::*;

    fn config(filter: &str, format: LogFormat) -> TelemetryConfig {
        TelemetryConfig {
            log_filter: filter.to_owned(),
            log_format: format,
        }
    }

    #[test]
    fn invalid_filters_name_the_expression() {
        let Err(error) = stderr_subscriber(&config("weft=loudest", LogFormat::Compact)) else {
            panic!("filter should not parse");
        };
        assert!(matches!(
            error,
            TelemetryError::Filter { ref filter, .. } if filter == "weft=loudest"
        ));
    }

    #[rstest]
    #[case(LogFormat::Json)]
    #[case(LogFormat::Compact)]
    fn both_formats_build_a_subscriber(#[case] format: LogFormat) {
        assert!(stderr_subscriber(&config("weft=debug,warn", format)).is_ok());
    }
}
