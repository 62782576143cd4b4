//! Log output formats.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Shape of the log lines emitted by the client.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One flattened JSON object per event, for the gateway log collector.
    #[default]
    Json,
    /// Single-line text for interactive debugging.
    Compact,
}

/// Error returned when a [`LogFormat`] name is not recognised.
pub type LogFormatParseError = strum::ParseError;
