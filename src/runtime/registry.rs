//! Command registry
//!
//! Provides a global catalog that the command library loader fills at
//! startup. Each runtime clones an immutable snapshot of the catalog, so
//! later registrations never change a running runtime's dispatch table.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use super::command::Command;
use super::context::normalize_key;
use super::error::{CommandError, CommandResult};

/// Shared command implementation
pub type CommandHandle = Arc<dyn Command>;

/// Global catalog of command implementations.
pub struct CommandCatalog {
    commands: RwLock<HashMap<String, CommandHandle>>,
}

static CATALOG: Lazy<CommandCatalog> = Lazy::new(CommandCatalog::new);

impl CommandCatalog {
    /// Create an empty catalog (tests and embedded hosts)
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(HashMap::new()),
        }
    }

    /// Access the global catalog singleton.
    pub fn global() -> &'static Self {
        &CATALOG
    }

    /// Register a command implementation under `name`.
    ///
    /// Re-registering a name replaces the previous implementation.
    pub fn register<C>(&self, name: &str, command: C)
    where
        C: Command + 'static,
    {
        let name = normalize_key(name);
        tracing::debug!("Registering command {}", name);
        self.commands.write().insert(name, Arc::new(command));
    }

    /// Register a command type that implements `Default`.
    pub fn register_default<C>(&self, name: &str)
    where
        C: Command + Default + 'static,
    {
        self.register(name, C::default());
    }

    /// Remove a command; returns whether it was registered
    pub fn unregister(&self, name: &str) -> bool {
        self.commands.write().remove(&normalize_key(name)).is_some()
    }

    /// Produce an immutable snapshot for a runtime instance.
    pub fn snapshot(&self) -> CommandRegistry {
        let commands = self.commands.read();
        CommandRegistry {
            commands: Arc::new(commands.clone()),
        }
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable runtime view of the command catalog.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: Arc<HashMap<String, CommandHandle>>,
}

impl CommandRegistry {
    /// Build a registry directly from `(name, command)` pairs
    pub fn from_commands<I>(commands: I) -> Self
    where
        I: IntoIterator<Item = (String, CommandHandle)>,
    {
        let commands = commands
            .into_iter()
            .map(|(name, command)| (normalize_key(&name), command))
            .collect();
        Self {
            commands: Arc::new(commands),
        }
    }

    /// Find the command registered under `name`
    pub fn lookup(&self, name: &str) -> CommandResult<CommandHandle> {
        let name = normalize_key(name);
        self.commands
            .get(&name)
            .cloned()
            .ok_or(CommandError::UnknownCommand(name))
    }

    /// Check whether the registry snapshot contains the specified command.
    pub fn has_command(&self, name: &str) -> bool {
        self.commands.contains_key(&normalize_key(name))
    }

    /// List all command names known to this snapshot, sorted.
    pub fn list_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.commands.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no commands are registered
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::command::CommandContext;
    use crate::runtime::entry::ScriptEntry;

    #[derive(Default)]
    struct Nothing;

    impl Command for Nothing {
        fn parse(&self, _entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
            Ok(())
        }

        fn execute(&self, _entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_registration() {
        let catalog = CommandCatalog::new();
        catalog.register_default::<Nothing>("noop");
        let snapshot = catalog.snapshot();

        catalog.register_default::<Nothing>("later");
        assert!(snapshot.has_command("NOOP"));
        assert!(!snapshot.has_command("later"));
        assert!(catalog.snapshot().has_command("later"));
    }

    #[test]
    fn test_lookup_normalizes_and_reports_unknown() {
        let catalog = CommandCatalog::new();
        catalog.register("Noop", Nothing);
        let registry = catalog.snapshot();

        assert!(registry.lookup("noop").is_ok());
        match registry.lookup("fly") {
            Err(err) => assert_eq!(err, CommandError::UnknownCommand("FLY".into())),
            Ok(_) => panic!("unexpected command"),
        }
    }

    #[test]
    fn test_unregister_and_listing() {
        let catalog = CommandCatalog::new();
        catalog.register_default::<Nothing>("b");
        catalog.register_default::<Nothing>("a");
        assert_eq!(catalog.snapshot().list_commands(), vec!["A", "B"]);

        assert!(catalog.unregister("A"));
        assert!(!catalog.unregister("A"));
        assert_eq!(catalog.snapshot().len(), 1);
    }

    #[test]
    fn test_registry_from_commands() {
        let registry =
            CommandRegistry::from_commands([("echo".to_string(), Arc::new(Nothing) as CommandHandle)]);
        assert!(registry.has_command("ECHO"));
        assert!(!registry.is_empty());
    }
}
