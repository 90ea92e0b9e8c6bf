//! Command registry mapping names to handlers.
//!
//! The registry is populated by the embedding application during
//! single-threaded startup, then moved into the bridge server and frozen
//! behind an `Arc`. Reads after startup need no synchronisation.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use tether_protocol::{CommandCatalog, CommandInfo, Params};

const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Opaque failure type surfaced by command handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of invoking a handler.
pub type HandlerResult = Result<Value, BoxError>;

/// Invocable value stored per registered command.
pub type CommandHandler = Box<dyn Fn(&Params) -> HandlerResult + Send + Sync>;

struct RegistryEntry {
    handler: CommandHandler,
    description: Option<String>,
}

/// Single source of truth mapping command names to handlers.
///
/// Names are unique; a later registration under the same name silently
/// replaces the earlier one, which doubles as re-registration support.
/// Replacements are logged at debug level so accidental collisions stay
/// diagnosable.
#[derive(Default)]
pub struct CommandRegistry {
    entries: BTreeMap<String, RegistryEntry>,
}

impl CommandRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites the entry for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, description: Option<&str>, handler: F)
    where
        F: Fn(&Params) -> HandlerResult + Send + Sync + 'static,
    {
        let name = name.into();
        let previous = self.entries.insert(
            name.clone(),
            RegistryEntry {
                handler: Box::new(handler),
                description: description.map(str::to_owned),
            },
        );
        if previous.is_some() {
            debug!(
                target: REGISTRY_TARGET,
                command = %name,
                "replaced existing command registration"
            );
        }
    }

    /// Looks up the handler registered for `name`.
    pub fn lookup(&self, name: &str) -> Option<&CommandHandler> {
        self.entries.get(name).map(|entry| &entry.handler)
    }

    /// Ordered listing of registered commands and their descriptions.
    pub fn catalog(&self) -> CommandCatalog {
        let commands = self
            .entries
            .iter()
            .map(|(name, entry)| CommandInfo {
                name: name.clone(),
                description: entry.description.clone(),
            })
            .collect();
        CommandCatalog::new(commands)
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when no commands are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("CommandRegistry")
            .field("commands", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}
