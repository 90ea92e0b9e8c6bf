//! Command dispatch: turning a (name, params) pair into a response.
//!
//! The dispatcher is the recovery boundary for everything a handler can
//! do wrong. Lookup misses, handler errors, and handler panics all come
//! back as error envelopes; nothing escapes to terminate the host thread
//! or the connection.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use tether_protocol::{Params, ResponseEnvelope};

use crate::registry::CommandRegistry;

const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Reserved introspection command; always available and never shadowed
/// by a registration under the same name.
pub const LIST_COMMANDS: &str = "list_commands";

/// Looks up handlers and normalises their outcomes into envelopes.
#[derive(Clone)]
pub struct CommandDispatcher {
    registry: Arc<CommandRegistry>,
}

impl CommandDispatcher {
    /// Creates a dispatcher over a frozen registry.
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Executes the named command and returns its response envelope.
    ///
    /// Total: every failure mode is converted into an error envelope.
    pub fn dispatch(&self, name: &str, params: &Params) -> ResponseEnvelope {
        if name == LIST_COMMANDS {
            return self.list_commands();
        }

        let Some(handler) = self.registry.lookup(name) else {
            debug!(target: DISPATCH_TARGET, command = %name, "unknown command");
            return ResponseEnvelope::error(format!("Unknown command type: {name}"));
        };

        match catch_unwind(AssertUnwindSafe(|| handler(params))) {
            Ok(Ok(result)) => ResponseEnvelope::success(result),
            Ok(Err(error)) => {
                warn!(
                    target: DISPATCH_TARGET,
                    command = %name,
                    error = %error,
                    "command handler failed"
                );
                ResponseEnvelope::error(error.to_string())
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!(
                    target: DISPATCH_TARGET,
                    command = %name,
                    message,
                    "command handler panicked"
                );
                ResponseEnvelope::error(format!("command handler panicked: {message}"))
            }
        }
    }

    fn list_commands(&self) -> ResponseEnvelope {
        match serde_json::to_value(self.registry.catalog()) {
            Ok(catalog) => ResponseEnvelope::success(catalog),
            Err(error) => ResponseEnvelope::error(error.to_string()),
        }
    }
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CommandDispatcher")
            .field("registry", &self.registry)
            .finish()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use tether_protocol::CommandCatalog;

    use super::*;

    fn dispatcher_with(registry: CommandRegistry) -> CommandDispatcher {
        CommandDispatcher::new(Arc::new(registry))
    }

    #[test]
    fn wraps_handler_result_in_success_envelope() {
        let mut registry = CommandRegistry::new();
        registry.register("ping", None, |_| Ok(json!("pong")));
        let dispatcher = dispatcher_with(registry);

        let response = dispatcher.dispatch("ping", &Params::new());
        assert_eq!(response, ResponseEnvelope::success("pong"));
    }

    #[test]
    fn handler_receives_bound_params() {
        let mut registry = CommandRegistry::new();
        registry.register("echo", None, |params| {
            params
                .get("payload")
                .cloned()
                .ok_or_else(|| "missing required parameter: payload".into())
        });
        let dispatcher = dispatcher_with(registry);

        let mut params = Params::new();
        params.insert("payload".into(), json!([1, 2, 3]));
        let response = dispatcher.dispatch("echo", &params);
        assert_eq!(response, ResponseEnvelope::success(json!([1, 2, 3])));

        let response = dispatcher.dispatch("echo", &Params::new());
        assert_eq!(
            response,
            ResponseEnvelope::error("missing required parameter: payload")
        );
    }

    #[test]
    fn unknown_command_uses_exact_message() {
        let dispatcher = dispatcher_with(CommandRegistry::new());
        let response = dispatcher.dispatch("missing_cmd", &Params::new());
        assert_eq!(
            response,
            ResponseEnvelope::error("Unknown command type: missing_cmd")
        );
    }

    #[test]
    fn handler_panic_becomes_error_envelope() {
        let mut registry = CommandRegistry::new();
        registry.register("explode", None, |_| panic!("handler blew up"));
        let dispatcher = dispatcher_with(registry);

        let response = dispatcher.dispatch("explode", &Params::new());
        match response {
            ResponseEnvelope::Error { message } => {
                assert!(message.contains("handler blew up"));
            }
            ResponseEnvelope::Success { .. } => panic!("expected error envelope"),
        }
    }

    #[test]
    fn list_commands_returns_catalog() {
        let mut registry = CommandRegistry::new();
        registry.register("ping", Some("Responds with pong"), |_| Ok(json!("pong")));
        let dispatcher = dispatcher_with(registry);

        let response = dispatcher.dispatch(LIST_COMMANDS, &Params::new());
        let ResponseEnvelope::Success { result } = response else {
            panic!("expected success envelope");
        };
        let catalog: CommandCatalog =
            serde_json::from_value(result).expect("catalog should decode");
        assert_eq!(catalog.count, 1);
        assert_eq!(catalog.commands[0].name, "ping");
    }

    #[test]
    fn list_commands_cannot_be_shadowed() {
        let mut registry = CommandRegistry::new();
        registry.register(LIST_COMMANDS, None, |_| Ok(json!("impostor")));
        let dispatcher = dispatcher_with(registry);

        let response = dispatcher.dispatch(LIST_COMMANDS, &Params::new());
        let ResponseEnvelope::Success { result } = response else {
            panic!("expected success envelope");
        };
        assert!(result.get("commands").is_some(), "catalog should win");
    }
}
