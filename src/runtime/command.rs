//! The command contract
//!
//! A command is implemented once per command kind and registered by name.
//! Dispatch always runs [`Command::parse`] and then [`Command::execute`] on
//! the same entry. `parse` turns the (tag-resolved) arguments into context
//! objects; `execute` reads only those objects, performs its effect through
//! host collaborators and reports a summary.

use super::debug::DebugReporter;
use super::entry::ScriptEntry;
use super::error::CommandResult;
use super::script::ScriptLibrary;

/// Collaborators available to a command while it runs
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    /// Normalized name the command was dispatched under
    pub command: &'a str,
    /// Debug reporting hook
    pub reporter: &'a dyn DebugReporter,
    /// Loaded script containers
    pub scripts: &'a ScriptLibrary,
}

impl<'a> CommandContext<'a> {
    /// Report a summary for `entry` under this command's name
    pub fn report(&self, entry: &ScriptEntry, summary: &str) {
        self.reporter.report(entry, self.command, summary);
    }

    /// Report an error message
    pub fn report_error(&self, message: &str) {
        self.reporter.report_error(message);
    }
}

/// Two-phase command behavior
pub trait Command: Send + Sync {
    /// Validate arguments and populate the entry's context store.
    ///
    /// Must either leave every object `execute` needs in place or fail with
    /// an invalid-arguments error naming what is missing.
    fn parse(&self, entry: &mut ScriptEntry, cx: &CommandContext<'_>) -> CommandResult<()>;

    /// Perform the command's effect from the context store and report it.
    ///
    /// A command that finishes asynchronously sets wait-for on the entry and
    /// arranges for [`ScriptEntry::completion`] to be signalled later.
    fn execute(&self, entry: &mut ScriptEntry, cx: &CommandContext<'_>) -> CommandResult<()>;
}
