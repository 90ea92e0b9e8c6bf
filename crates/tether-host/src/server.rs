//! Bridge server lifecycle.
//!
//! Wires the frozen registry through the dispatcher, scheduler, and
//! connection handler, then runs the socket listener. The embedding
//! application keeps the returned [`TickQueue`] and drains it from its
//! own execution thread.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use tether_config::{Config, SocketEndpoint};

use crate::connection::BridgeConnectionHandler;
use crate::dispatch::CommandDispatcher;
use crate::registry::CommandRegistry;
use crate::scheduler::{TickQueue, scheduler};
use crate::transport::{ListenerError, ListenerHandle, SocketListener};

const SERVER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::server");

/// Errors surfaced by the bridge server lifecycle.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The listener failed to bind, start, or stop.
    #[error(transparent)]
    Listener(#[from] ListenerError),
    /// `start` was called while the server was already running.
    #[error("bridge server is already running")]
    AlreadyRunning,
}

enum ServerState {
    Stopped,
    Running {
        handle: ListenerHandle,
        local_addr: Option<SocketAddr>,
    },
}

/// Socket server accepting bridge clients on a configured endpoint.
///
/// Lifecycle: `Stopped -> Running -> Stopped`. A bind failure during
/// [`start`](Self::start) leaves the server stopped. [`stop`](Self::stop)
/// joins the accept thread; live client connections are not forcibly
/// closed and wind down when their sockets fail or their peers leave.
pub struct BridgeServer {
    endpoint: SocketEndpoint,
    command_timeout: Duration,
    state: ServerState,
}

impl BridgeServer {
    /// Creates a stopped server for the configured endpoint.
    pub fn new(config: &Config) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            command_timeout: config.command_timeout(),
            state: ServerState::Stopped,
        }
    }

    /// Binds the endpoint and starts accepting clients.
    ///
    /// The registry is frozen here: it moves behind an `Arc` and is
    /// read-only for the rest of the server's life. Returns the
    /// [`TickQueue`] the host application must drain on its own thread.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::AlreadyRunning`] when called twice, and a
    /// listener error when the bind fails; in both cases the running
    /// state is unchanged.
    pub fn start(&mut self, registry: CommandRegistry) -> Result<TickQueue, BridgeError> {
        if matches!(self.state, ServerState::Running { .. }) {
            return Err(BridgeError::AlreadyRunning);
        }

        let listener = SocketListener::bind(&self.endpoint)?;
        let local_addr = listener.local_addr();

        let dispatcher = CommandDispatcher::new(Arc::new(registry));
        let (submitter, ticks) = scheduler(dispatcher);
        let handler = Arc::new(BridgeConnectionHandler::new(
            submitter,
            self.command_timeout,
        ));
        let handle = listener.start(handler)?;

        info!(
            target: SERVER_TARGET,
            endpoint = %self.endpoint,
            "bridge server started"
        );
        self.state = ServerState::Running { handle, local_addr };
        Ok(ticks)
    }

    /// Stops accepting clients and joins the accept thread.
    ///
    /// Safe to call when already stopped.
    ///
    /// # Errors
    ///
    /// Returns a listener error when the accept thread panicked.
    pub fn stop(&mut self) -> Result<(), BridgeError> {
        match std::mem::replace(&mut self.state, ServerState::Stopped) {
            ServerState::Stopped => Ok(()),
            ServerState::Running { handle, .. } => {
                handle.shutdown();
                handle.join()?;
                info!(target: SERVER_TARGET, "bridge server stopped");
                Ok(())
            }
        }
    }

    /// Returns true while the accept loop is running.
    pub fn is_running(&self) -> bool {
        matches!(self.state, ServerState::Running { .. })
    }

    /// Address the listener bound, once running. Useful when the
    /// configured port is 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &self.state {
            ServerState::Running { local_addr, .. } => *local_addr,
            ServerState::Stopped => None,
        }
    }
}
