//! Command dispatch
//!
//! Runs one entry through tag resolution, registry lookup, `parse` and
//! `execute`. Errors are returned to the caller; the queue scheduler turns
//! them into reports.

use std::sync::Arc;

use super::command::CommandContext;
use super::debug::DebugReporter;
use super::entry::ScriptEntry;
use super::error::CommandResult;
use super::registry::CommandRegistry;
use super::script::ScriptLibrary;
use super::tags::{TagResolver, resolve_entry};

/// Dispatcher shared by every queue of a runtime
#[derive(Clone)]
pub struct CommandExecutor {
    registry: CommandRegistry,
    resolver: Arc<dyn TagResolver>,
    reporter: Arc<dyn DebugReporter>,
    scripts: Arc<ScriptLibrary>,
}

impl CommandExecutor {
    /// Create a dispatcher from its collaborators
    pub fn new(
        registry: CommandRegistry,
        resolver: Arc<dyn TagResolver>,
        reporter: Arc<dyn DebugReporter>,
        scripts: Arc<ScriptLibrary>,
    ) -> Self {
        Self {
            registry,
            resolver,
            reporter,
            scripts,
        }
    }

    /// Registry this dispatcher looks commands up in
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Debug reporting hook
    pub fn reporter(&self) -> &dyn DebugReporter {
        self.reporter.as_ref()
    }

    /// Loaded script containers
    pub fn scripts(&self) -> &ScriptLibrary {
        &self.scripts
    }

    /// Resolve tags, then parse and execute `entry` with its command.
    ///
    /// `execute` is never reached when lookup or `parse` fails.
    pub fn dispatch(&self, entry: &mut ScriptEntry) -> CommandResult<()> {
        resolve_entry(entry, self.resolver.as_ref(), self.reporter.as_ref());

        let command = self.registry.lookup(entry.command_name())?;
        let name = entry.command_name().to_string();
        let cx = CommandContext {
            command: &name,
            reporter: self.reporter.as_ref(),
            scripts: &self.scripts,
        };

        tracing::trace!(entry = %entry.id(), "parsing {}", name);
        command.parse(entry, &cx)?;
        tracing::trace!(entry = %entry.id(), "executing {}", name);
        command.execute(entry, &cx)
    }
}
