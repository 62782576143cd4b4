//! Layered configuration for the ZigbeeCore control-plane client.
//!
//! Values are merged by `ortho_config` in increasing precedence: built-in
//! defaults, a TOML file named by `--config-path` (or `ZHAL_CONFIG_PATH`),
//! `ZHAL_*` environment variables, then command-line flags.

mod defaults;
mod endpoint;
mod logging;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_BUSY_LEASE_SECS, DEFAULT_CONNECT_TIMEOUT_MS, DEFAULT_CORE_PORT, DEFAULT_EVENT_PORT,
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_RECEIVE_TIMEOUT_MS, DEFAULT_SEND_TIMEOUT_MS,
    default_host, default_log_filter, default_log_format,
};
pub use endpoint::{EndpointError, TcpEndpoint};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "ZHAL")]
pub struct Config {
    /// Host running the ZigbeeCore command listener.
    #[ortho_config(default = defaults::default_host())]
    pub core_host: String,
    /// Port of the ZigbeeCore command listener.
    #[ortho_config(default = DEFAULT_CORE_PORT)]
    pub core_port: u16,
    /// Local host the asynchronous receiver binds to.
    #[ortho_config(default = defaults::default_host())]
    pub event_host: String,
    /// Local port the asynchronous receiver binds to. Zero picks a free port.
    #[ortho_config(default = DEFAULT_EVENT_PORT)]
    pub event_port: u16,
    /// Upper bound for establishing a command connection.
    #[ortho_config(default = DEFAULT_CONNECT_TIMEOUT_MS)]
    pub connect_timeout_ms: u64,
    /// Upper bound for writing one command frame.
    #[ortho_config(default = DEFAULT_SEND_TIMEOUT_MS)]
    pub send_timeout_ms: u64,
    /// Upper bound for reading the synchronous acknowledgement.
    #[ortho_config(default = DEFAULT_RECEIVE_TIMEOUT_MS)]
    pub receive_timeout_ms: u64,
    /// Seconds a device may stay busy without a response. Zero disables the
    /// lease and keeps the device busy until its response arrives.
    #[ortho_config(default = DEFAULT_BUSY_LEASE_SECS)]
    pub busy_lease_secs: u64,
    /// `tracing` filter expression.
    #[ortho_config(default = defaults::default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core_host: default_host(),
            core_port: DEFAULT_CORE_PORT,
            event_host: default_host(),
            event_port: DEFAULT_EVENT_PORT,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
            receive_timeout_ms: DEFAULT_RECEIVE_TIMEOUT_MS,
            busy_lease_secs: DEFAULT_BUSY_LEASE_SECS,
            log_filter: defaults::default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Endpoint of the ZigbeeCore command listener.
    #[must_use]
    pub fn core_endpoint(&self) -> TcpEndpoint {
        TcpEndpoint::new(self.core_host.clone(), self.core_port)
    }

    /// Endpoint the asynchronous receiver binds to.
    #[must_use]
    pub fn event_endpoint(&self) -> TcpEndpoint {
        TcpEndpoint::new(self.event_host.clone(), self.event_port)
    }

    /// Timeout applied while connecting to ZigbeeCore.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Socket write timeout for command frames.
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Socket read timeout for acknowledgements.
    #[must_use]
    pub const fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    /// Busy lease, or `None` when devices stay busy until answered.
    #[must_use]
    pub fn busy_lease(&self) -> Option<Duration> {
        (self.busy_lease_secs > 0).then(|| Duration::from_secs(self.busy_lease_secs))
    }

    /// Filter expression handed to the tracing subscriber.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Output format for structured logs.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks values that the loader accepts syntactically but the client
    /// cannot operate with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.core_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost { field: "core_host" });
        }
        if self.event_host.trim().is_empty() {
            return Err(ConfigError::EmptyHost {
                field: "event_host",
            });
        }
        if self.core_port == 0 {
            return Err(ConfigError::ZeroCorePort);
        }
        let timeouts = [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("send_timeout_ms", self.send_timeout_ms),
            ("receive_timeout_ms", self.receive_timeout_ms),
        ];
        if let Some((field, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroTimeout { field });
        }
        Ok(())
    }
}

/// Configuration values rejected by [`Config::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A host field was blank.
    #[error("{field} must not be empty")]
    EmptyHost {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The ZigbeeCore port cannot be chosen by the operating system.
    #[error("core_port must be non-zero")]
    ZeroCorePort,
    /// A transport timeout of zero would block the worker indefinitely.
    #[error("{field} must be greater than zero")]
    ZeroTimeout {
        /// Name of the offending field.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn defaults_validate() {
        Config::default().validate().expect("defaults should validate");
    }

    #[rstest]
    fn lease_is_disabled_by_default() {
        assert_eq!(Config::default().busy_lease(), None);
    }

    #[rstest]
    fn lease_converts_seconds() {
        let config = Config {
            busy_lease_secs: 30,
            ..Config::default()
        };
        assert_eq!(config.busy_lease(), Some(Duration::from_secs(30)));
    }

    #[rstest]
    #[case::connect(Config { connect_timeout_ms: 0, ..Config::default() }, "connect_timeout_ms")]
    #[case::send(Config { send_timeout_ms: 0, ..Config::default() }, "send_timeout_ms")]
    #[case::receive(Config { receive_timeout_ms: 0, ..Config::default() }, "receive_timeout_ms")]
    fn rejects_zero_timeouts(#[case] config: Config, #[case] expected: &'static str) {
        let error = config.validate().expect_err("zero timeout must be rejected");
        assert_eq!(error, ConfigError::ZeroTimeout { field: expected });
    }

    #[rstest]
    fn rejects_blank_core_host() {
        let config = Config {
            core_host: "  ".to_owned(),
            ..Config::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyHost { field: "core_host" })
        );
    }

    #[rstest]
    fn rejects_zero_core_port() {
        let config = Config {
            core_port: 0,
            ..Config::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroCorePort));
    }

    #[rstest]
    fn endpoints_follow_fields() {
        let config = Config {
            core_host: "10.0.0.2".to_owned(),
            core_port: 9000,
            event_port: 0,
            ..Config::default()
        };
        assert_eq!(config.core_endpoint().to_string(), "tcp://10.0.0.2:9000");
        assert_eq!(config.event_endpoint().port(), 0);
    }
}
