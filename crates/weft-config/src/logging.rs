//! Event output formats.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr, VariantNames};
use thiserror::Error;

/// How telemetry events are rendered on standard error.
///
/// Names parse case-insensitively wherever they come from, so
/// `WEFT_LOG_FORMAT=JSON` and `log_format = "Json"` both select JSON.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    EnumString,
    Display,
    IntoStaticStr,
    VariantNames,
)]
#[serde(try_from = "String", into = "&'static str")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event.
    Json,
    /// One line per event for people reading a terminal.
    #[default]
    Compact,
}

impl LogFormat {
    /// Whether events are emitted as machine-readable records.
    #[must_use]
    pub const fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Accepted names, comma separated, for error messages.
    #[must_use]
    pub fn expected_names() -> String {
        Self::VARIANTS.join(", ")
    }
}

/// A format name that matches no [`LogFormat`].
#[derive(Debug, Clone, Error)]
#[error(
    "invalid log format '{value}' (expected one of: {expected})",
    expected = LogFormat::expected_names()
)]
pub struct InvalidLogFormat {
    /// Raw value that failed to parse.
    pub value: String,
    /// Underlying parse failure.
    #[source]
    pub source: strum::ParseError,
}

impl TryFrom<String> for LogFormat {
    type Error = InvalidLogFormat;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .trim()
            .parse()
            .map_err(|source| InvalidLogFormat { value, source })
    }
}
