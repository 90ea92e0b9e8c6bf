//! Error types for the client connector.

use std::io;

use thiserror::Error;

use tether_protocol::EnvelopeError;

/// Errors surfaced to callers of the connector.
///
/// Receive timeouts, unparseable responses, and host-reported command
/// failures are distinct kinds so callers can tell a slow host from a
/// broken channel from a failing handler.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bridge host name did not resolve.
    #[error("failed to resolve bridge address {endpoint}: {source}")]
    Resolve {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// TCP connection could not be established.
    #[error("failed to connect to bridge at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },
    /// Request envelope failed to serialise.
    #[error("failed to serialise command request: {0}")]
    SerialiseRequest(#[source] serde_json::Error),
    /// Socket failure while writing the request.
    #[error("failed to send request to bridge: {0}")]
    SendRequest(#[source] io::Error),
    /// Socket failure while reading the response.
    #[error("failed to read response from bridge: {0}")]
    ReadResponse(#[source] io::Error),
    /// No response frame arrived within the receive timeout.
    #[error("timed out waiting for a response from the bridge")]
    ReceiveTimeout,
    /// The bridge closed the connection before responding.
    #[error("bridge closed the connection before responding")]
    ConnectionClosed,
    /// Response frame exceeded the protocol size limit.
    #[error("response too large: {size} bytes exceeds {max} byte limit")]
    ResponseTooLarge { size: usize, max: usize },
    /// Response frame was not a valid response envelope.
    #[error("invalid response from bridge: {0}")]
    ParseResponse(#[source] EnvelopeError),
    /// The host executed the command and reported a failure.
    #[error("bridge returned an error: {message}")]
    Command { message: String },
}

impl ClientError {
    /// True when the cached connection can no longer be trusted and
    /// must be discarded so the next call reconnects.
    pub(crate) fn invalidates_connection(&self) -> bool {
        matches!(
            self,
            Self::SendRequest(_)
                | Self::ReadResponse(_)
                | Self::ReceiveTimeout
                | Self::ConnectionClosed
                | Self::ResponseTooLarge { .. }
        )
    }
}
