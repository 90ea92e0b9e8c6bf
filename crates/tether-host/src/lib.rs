//! Embedded command bridge for single-threaded host applications.
//!
//! A host application that only permits state mutation on its own
//! execution thread embeds this crate to accept commands from an
//! external control process. The host registers its command handlers in
//! a [`CommandRegistry`] during startup, hands the registry to a
//! [`BridgeServer`], and drains the returned [`TickQueue`] from its
//! per-tick execution mechanism. Everything between the socket and that
//! tick (framing, dispatch, the cross-thread handoff, and the bounded
//! wait for results) is owned here.
//!
//! ```no_run
//! use tether_config::Config;
//! use tether_host::{BridgeServer, CommandRegistry};
//!
//! # fn main() -> Result<(), tether_host::BridgeError> {
//! let mut registry = CommandRegistry::new();
//! registry.register("ping", Some("Responds with pong"), |_params| {
//!     Ok(serde_json::json!("pong"))
//! });
//!
//! let mut server = BridgeServer::new(&Config::default());
//! let ticks = server.start(registry)?;
//! loop {
//!     // ... the host's own per-tick work ...
//!     ticks.run_pending();
//! }
//! # }
//! ```

mod connection;
mod dispatch;
mod registry;
mod scheduler;
mod server;
pub mod telemetry;
mod transport;

pub use dispatch::{CommandDispatcher, LIST_COMMANDS};
pub use registry::{BoxError, CommandHandler, CommandRegistry, HandlerResult};
pub use scheduler::{
    JobSubmitter, PendingJob, SubmitError, TIMEOUT_MESSAGE, TickQueue, scheduler,
};
pub use server::{BridgeError, BridgeServer};
pub use telemetry::{TelemetryError, TelemetryHandle};
pub use transport::ListenerError;
