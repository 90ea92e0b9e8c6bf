//! Command and response envelopes.
//!
//! A command names the operation to run on the host and carries a mapping
//! of named parameters. A response reports either a success payload or an
//! error message, discriminated by the `status` field; exactly one of
//! `result`/`message` appears on the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Named parameters carried by a command.
pub type Params = serde_json::Map<String, Value>;

/// Command sent from the controller to the host.
///
/// The operation name is serialised as `type` for wire parity with the
/// response's `status` discriminator. `params` is never absent: a missing
/// mapping decodes as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    /// Name of the registered command to invoke.
    #[serde(rename = "type")]
    pub name: String,
    /// Named parameters bound into the handler.
    #[serde(default)]
    pub params: Params,
}

impl CommandEnvelope {
    /// Builds a command envelope with the given parameters.
    pub fn new(name: impl Into<String>, params: Params) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }

    /// Builds a command envelope with no parameters.
    pub fn bare(name: impl Into<String>) -> Self {
        Self::new(name, Params::new())
    }

    /// Parses a single frame into a command envelope.
    ///
    /// Trailing ASCII whitespace (including the frame delimiter) is
    /// trimmed before parsing.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Empty`] for a blank frame and
    /// [`EnvelopeError::Malformed`] when the frame is not a valid command
    /// envelope.
    pub fn parse(frame: &[u8]) -> Result<Self, EnvelopeError> {
        let trimmed = trim_trailing_whitespace(frame);
        if trimmed.is_empty() {
            return Err(EnvelopeError::Empty);
        }
        serde_json::from_slice(trimmed).map_err(EnvelopeError::Malformed)
    }
}

/// Response sent from the host back to the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResponseEnvelope {
    /// The handler completed and returned a payload.
    Success {
        /// Value returned by the handler, forwarded verbatim.
        result: Value,
    },
    /// The command could not be completed.
    Error {
        /// Human-readable failure description.
        message: String,
    },
}

impl ResponseEnvelope {
    /// Builds a success response wrapping the handler's return value.
    pub fn success(result: impl Into<Value>) -> Self {
        Self::Success {
            result: result.into(),
        }
    }

    /// Builds an error response with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns true for success responses.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Parses a single frame into a response envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Empty`] for a blank frame and
    /// [`EnvelopeError::Malformed`] when the frame is not a valid
    /// response envelope.
    pub fn parse(frame: &[u8]) -> Result<Self, EnvelopeError> {
        let trimmed = trim_trailing_whitespace(frame);
        if trimmed.is_empty() {
            return Err(EnvelopeError::Empty);
        }
        serde_json::from_slice(trimmed).map_err(EnvelopeError::Malformed)
    }
}

/// Errors surfaced while decoding an envelope from a frame.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Frame contained only whitespace.
    #[error("empty frame")]
    Empty,
    /// Frame was not valid JSON for the expected envelope schema.
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),
}

fn trim_trailing_whitespace(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|pos| pos + 1)
        .unwrap_or(0);
    &bytes[..end]
}
