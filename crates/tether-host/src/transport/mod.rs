//! Socket listener for the bridge endpoint.
//!
//! The transport module binds the configured TCP endpoint and accepts
//! connections in a background thread, handing each accepted stream to a
//! [`ConnectionHandler`] on its own thread.

mod errors;
mod listener;

pub use self::errors::ListenerError;
pub(crate) use self::listener::{ConnectionHandler, ListenerHandle, SocketListener};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
