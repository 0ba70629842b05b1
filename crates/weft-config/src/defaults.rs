/// Environment variable holding the tracing filter expression.
pub const LOG_FILTER_ENV: &str = "WEFT_LOG_FILTER";

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "WEFT_LOG_FORMAT";

/// Default log filter expression. Command-line tools stay quiet unless asked.
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub fn default_log_format() -> crate::logging::LogFormat {
    crate::logging::LogFormat::Compact
}
