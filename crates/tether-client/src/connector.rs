//! Synchronous request/response connector.

use std::io;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use tether_config::{DEFAULT_CONNECT_TIMEOUT, DEFAULT_RECEIVE_TIMEOUT, SocketEndpoint};
use tether_protocol::{
    CommandEnvelope, FrameBuffer, FrameError, Params, ResponseEnvelope, write_frame,
};

use crate::errors::ClientError;

const CONNECTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::connector");

/// Synchronous client for a tether bridge host.
///
/// The underlying TCP connection is opened lazily on the first call and
/// cached across calls. Any socket-level failure discards the cached
/// connection; the next call reconnects. No automatic retry is
/// performed.
#[derive(Debug)]
pub struct Connector {
    endpoint: SocketEndpoint,
    connect_timeout: Duration,
    receive_timeout: Duration,
    stream: Option<TcpStream>,
    frames: FrameBuffer,
}

impl Connector {
    /// Creates a disconnected connector for the given endpoint.
    pub fn new(endpoint: SocketEndpoint) -> Self {
        Self {
            endpoint,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            stream: None,
            frames: FrameBuffer::new(),
        }
    }

    /// Overrides the wait for a response frame. The default is sized
    /// for slow host-side operations.
    #[must_use]
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Overrides the wait for the TCP connection to establish.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Opens the connection if it is not already open.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Resolve`] or [`ClientError::Connect`] when
    /// the endpoint cannot be reached.
    pub fn connect(&mut self) -> Result<(), ClientError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let address = resolve(&self.endpoint)?;
        let stream = TcpStream::connect_timeout(&address, self.connect_timeout).map_err(
            |source| ClientError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            },
        )?;
        stream
            .set_read_timeout(Some(self.receive_timeout))
            .map_err(|source| ClientError::Connect {
                endpoint: self.endpoint.to_string(),
                source,
            })?;
        debug!(target: CONNECTOR_TARGET, endpoint = %self.endpoint, "connected to bridge");
        self.frames = FrameBuffer::new();
        self.stream = Some(stream);
        Ok(())
    }

    /// True while a connection is cached.
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Closes the connection and clears cached state.
    ///
    /// Safe to call when already disconnected.
    pub fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
            debug!(target: CONNECTOR_TARGET, "disconnected from bridge");
        }
        self.frames = FrameBuffer::new();
    }

    /// Sends one command and blocks for its response.
    ///
    /// Connects lazily when needed. A success response yields the
    /// handler's result payload; an error response surfaces as
    /// [`ClientError::Command`].
    ///
    /// # Errors
    ///
    /// See [`ClientError`] for the failure taxonomy. Socket-level
    /// failures additionally discard the cached connection.
    pub fn send_command(
        &mut self,
        name: impl Into<String>,
        params: Params,
    ) -> Result<Value, ClientError> {
        self.connect()?;
        let envelope = CommandEnvelope::new(name, params);

        match self.exchange(&envelope) {
            Ok(result) => Ok(result),
            Err(error) => {
                if error.invalidates_connection() {
                    self.disconnect();
                }
                Err(error)
            }
        }
    }

    fn exchange(&mut self, envelope: &CommandEnvelope) -> Result<Value, ClientError> {
        let Some(stream) = self.stream.as_mut() else {
            return Err(ClientError::ConnectionClosed);
        };

        debug!(
            target: CONNECTOR_TARGET,
            command = %envelope.name,
            "sending command"
        );
        write_frame(stream, envelope).map_err(map_send_error)?;

        let frame = self
            .frames
            .read_frame(stream)
            .map_err(map_receive_error)?
            .ok_or(ClientError::ConnectionClosed)?;

        match ResponseEnvelope::parse(&frame).map_err(ClientError::ParseResponse)? {
            ResponseEnvelope::Success { result } => Ok(result),
            ResponseEnvelope::Error { message } => Err(ClientError::Command { message }),
        }
    }
}

fn resolve(endpoint: &SocketEndpoint) -> Result<SocketAddr, ClientError> {
    let mut addrs = (endpoint.host(), endpoint.port())
        .to_socket_addrs()
        .map_err(|source| ClientError::Resolve {
            endpoint: endpoint.to_string(),
            source,
        })?;
    addrs
        .find(|addr| matches!(addr, SocketAddr::V4(_) | SocketAddr::V6(_)))
        .ok_or_else(|| ClientError::Resolve {
            endpoint: endpoint.to_string(),
            source: io::Error::new(io::ErrorKind::AddrNotAvailable, "no resolved addresses"),
        })
}

fn map_send_error(error: FrameError) -> ClientError {
    match error {
        FrameError::Serialise(source) => ClientError::SerialiseRequest(source),
        FrameError::Io(source) => ClientError::SendRequest(source),
        FrameError::TooLarge { size, max } => ClientError::ResponseTooLarge { size, max },
    }
}

fn map_receive_error(error: FrameError) -> ClientError {
    match error {
        FrameError::Io(source)
            if matches!(
                source.kind(),
                io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ) =>
        {
            ClientError::ReceiveTimeout
        }
        FrameError::Io(source) => ClientError::ReadResponse(source),
        FrameError::TooLarge { size, max } => ClientError::ResponseTooLarge { size, max },
        FrameError::Serialise(source) => ClientError::SerialiseRequest(source),
    }
}
