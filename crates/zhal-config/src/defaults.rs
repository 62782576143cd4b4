//! Built-in configuration defaults.

use crate::logging::LogFormat;

/// Host used for both the ZigbeeCore listener and the local receiver.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Port ZigbeeCore accepts commands on.
pub const DEFAULT_CORE_PORT: u16 = 18443;

/// Port the client listens on for events and asynchronous responses.
pub const DEFAULT_EVENT_PORT: u16 = 18444;

/// Connect timeout for one command connection, in milliseconds.
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2_000;

/// Write timeout for one command frame, in milliseconds.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 2_000;

/// Read timeout for the synchronous acknowledgement, in milliseconds.
pub const DEFAULT_RECEIVE_TIMEOUT_MS: u64 = 5_000;

/// Busy lease in seconds; zero disables lease reaping.
pub const DEFAULT_BUSY_LEASE_SECS: u64 = 0;

/// Default log filter expression.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned default host, as required by the loader.
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default log filter expression.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
pub(crate) fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
