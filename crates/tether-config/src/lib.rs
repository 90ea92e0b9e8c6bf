//! Declarative configuration shared by the bridge host and client.
//!
//! The embedding application constructs a [`Config`] programmatically (or
//! deserialises one) and hands it to the bridge server; the client
//! connector consumes the same endpoint and timeout types from the other
//! end of the wire.

mod defaults;
mod logging;
mod socket;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_BIND_HOST, DEFAULT_COMMAND_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_LOG_FILTER,
    DEFAULT_RECEIVE_TIMEOUT, DEFAULT_TCP_PORT, default_endpoint, default_log_filter_string,
    default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};
pub use socket::{EndpointParseError, MIN_TCP_PORT, SocketEndpoint};

/// Bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Endpoint the bridge server binds and clients connect to.
    pub endpoint: SocketEndpoint,
    /// Bound wait for a command to finish on the host thread, in seconds.
    pub command_timeout_secs: u64,
    /// Log filter expression handed to the telemetry subscriber.
    pub log_filter: String,
    /// Output format for emitted telemetry.
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT.as_secs(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Command timeout as a [`Duration`].
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Log filter expression for the telemetry subscriber.
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Configured telemetry output format.
    pub fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Validates field combinations that serde cannot check structurally.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointParseError::PortOutOfRange`] when the endpoint
    /// port falls outside the recognised range.
    pub fn validate(&self) -> Result<(), EndpointParseError> {
        self.endpoint.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        config.validate().expect("default config should validate");
        assert_eq!(config.endpoint.port(), DEFAULT_TCP_PORT);
        assert_eq!(config.command_timeout(), DEFAULT_COMMAND_TIMEOUT);
    }

    #[test]
    fn deserialises_partial_config_with_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"command_timeout_secs": 5}"#).expect("parse partial config");
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
        assert_eq!(config.endpoint.host(), DEFAULT_BIND_HOST);
    }
}
