//! Default configuration values shared by the host and client crates.

use std::time::Duration;

use crate::logging::LogFormat;
use crate::socket::SocketEndpoint;

/// Default host the bridge binds to; loopback only.
pub const DEFAULT_BIND_HOST: &str = "localhost";

/// Default TCP port for the bridge endpoint.
pub const DEFAULT_TCP_PORT: u16 = 9876;

/// Bound wait for a command to complete on the host thread.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-side wait for a response frame, sized for slow host operations.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(120);

/// Client-side wait for the TCP connection to establish.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default log filter expression used by the telemetry subscriber.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned log filter value used where allocation is required (e.g. serde).
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

/// Default telemetry output format.
pub fn default_log_format() -> LogFormat {
    LogFormat::default()
}

/// Computes the default bridge endpoint.
pub fn default_endpoint() -> SocketEndpoint {
    SocketEndpoint::new(DEFAULT_BIND_HOST, DEFAULT_TCP_PORT)
}
