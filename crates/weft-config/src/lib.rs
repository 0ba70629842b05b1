//! Shared configuration for weft-based command-line programs.
//!
//! The crate owns the knobs that sit around the binding engine rather than
//! inside it: how verbose the tracing output is and which format it uses.
//! [`TelemetryConfig`] is loaded by `ortho_config`, layering built-in
//! defaults, `.weft.toml` configuration files and `WEFT_`-prefixed
//! environment variables (`WEFT_LOG_FILTER`, `WEFT_LOG_FORMAT`). The struct
//! stays serde-friendly so embedders can also nest it in their own files.

mod defaults;
mod logging;

use std::sync::Arc;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_LOG_FILTER, LOG_FILTER_ENV, LOG_FORMAT_ENV, default_log_filter_string,
    default_log_format,
};
pub use logging::{InvalidLogFormat, LogFormat};

/// Telemetry settings consumed by `weft::telemetry::initialise`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "WEFT")]
pub struct TelemetryConfig {
    /// Tracing filter expression, for example `weft=debug`.
    #[serde(default = "default_log_filter_string")]
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Output format for emitted events.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl TelemetryConfig {
    /// Returns the configured filter expression. A blank filter falls back to
    /// [`DEFAULT_LOG_FILTER`].
    #[must_use]
    pub fn log_filter(&self) -> &str {
        match self.log_filter.trim() {
            "" => DEFAULT_LOG_FILTER,
            filter => filter,
        }
    }

    /// Returns the configured output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Loads settings from configuration files and the process environment.
    ///
    /// Only the program name is taken from the command line; every other
    /// argument belongs to the program's own commands.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Load`] when a configuration source is
    /// malformed, for example when `WEFT_LOG_FORMAT` names no known format.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load_from_iter(std::env::args_os().take(1)).map_err(ConfigError::from)
    }
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration source could not be read or merged.
    #[error("failed to load configuration: {source}")]
    Load {
        /// Underlying loader error.
        #[from]
        source: Arc<OrthoError>,
    },
}
