//! Introspection payload returned by the reserved `list_commands` command.

use serde::{Deserialize, Serialize};

/// One registered command as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Name the command is invoked by.
    pub name: String,
    /// Optional human-readable description.
    pub description: Option<String>,
}

/// Full listing of the commands a host exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandCatalog {
    /// Registered commands in name order.
    pub commands: Vec<CommandInfo>,
    /// Total number of entries in `commands`.
    pub count: usize,
}

impl CommandCatalog {
    /// Builds a catalog from an ordered command listing.
    pub fn new(commands: Vec<CommandInfo>) -> Self {
        Self {
            count: commands.len(),
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_counts_entries() {
        let catalog = CommandCatalog::new(vec![
            CommandInfo {
                name: "create_wall".into(),
                description: Some("Create a wall".into()),
            },
            CommandInfo {
                name: "ping".into(),
                description: None,
            },
        ]);
        assert_eq!(catalog.count, 2);

        let encoded = serde_json::to_string(&catalog).expect("encode catalog");
        assert!(encoded.contains(r#""count":2"#));
        assert!(encoded.contains(r#""name":"create_wall""#));
    }
}
