//! Declarative configuration for the bridge TCP endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::defaults::{DEFAULT_BIND_HOST, DEFAULT_TCP_PORT};

/// Lowest port the bridge recognises; everything below is reserved for
/// system services.
pub const MIN_TCP_PORT: u16 = 1024;

/// TCP endpoint the bridge server binds and clients connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketEndpoint {
    host: String,
    port: u16,
}

impl SocketEndpoint {
    /// Builds an endpoint without range validation.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Builds an endpoint, rejecting ports outside the recognised range.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointParseError::PortOutOfRange`] for ports below
    /// [`MIN_TCP_PORT`].
    pub fn checked(host: impl Into<String>, port: u16) -> Result<Self, EndpointParseError> {
        let endpoint = Self::new(host, port);
        endpoint.validate()?;
        Ok(endpoint)
    }

    /// Host name or address to bind or connect to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Checks the port against the recognised range.
    ///
    /// # Errors
    ///
    /// Returns [`EndpointParseError::PortOutOfRange`] for ports below
    /// [`MIN_TCP_PORT`].
    pub fn validate(&self) -> Result<(), EndpointParseError> {
        if self.port < MIN_TCP_PORT {
            return Err(EndpointParseError::PortOutOfRange { port: self.port });
        }
        Ok(())
    }
}

impl Default for SocketEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_BIND_HOST, DEFAULT_TCP_PORT)
    }
}

impl fmt::Display for SocketEndpoint {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "tcp://{}:{}", self.host, self.port)
    }
}

impl FromStr for SocketEndpoint {
    type Err = EndpointParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let url = Url::parse(input)?;
        if url.scheme() != "tcp" {
            return Err(EndpointParseError::UnsupportedScheme(
                url.scheme().to_string(),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| EndpointParseError::MissingHost(input.to_string()))?;
        let port = url
            .port()
            .ok_or_else(|| EndpointParseError::MissingPort(input.to_string()))?;
        Self::checked(host, port)
    }
}

/// Errors encountered while parsing or validating a [`SocketEndpoint`].
#[derive(Debug, Error)]
pub enum EndpointParseError {
    /// Scheme was not `tcp`.
    #[error("unsupported endpoint scheme '{0}'")]
    UnsupportedScheme(String),
    /// Host name was missing.
    #[error("missing host in '{0}'")]
    MissingHost(String),
    /// Port was missing from the address.
    #[error("missing port in '{0}'")]
    MissingPort(String),
    /// Port fell outside the recognised 1024-65535 range.
    #[error("port {port} is outside the recognised range 1024-65535")]
    PortOutOfRange { port: u16 },
    /// URL failed to parse.
    #[error(transparent)]
    Url(#[from] url::ParseError),
}
