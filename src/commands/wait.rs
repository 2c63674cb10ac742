//! WAIT: hold the queue for a duration
//!
//! ```text
//! wait (duration:)<duration>
//! ```
//!
//! Execution arms a timer on the current tokio runtime and marks the entry
//! wait-for; the timer signals completion when it fires.

use std::time::Duration;

use crate::runtime::args::interpret;
use crate::runtime::command::{Command, CommandContext};
use crate::runtime::debug::debug_obj;
use crate::runtime::entry::ScriptEntry;
use crate::runtime::error::{CommandError, CommandResult};
use crate::runtime::value::ContextValue;

/// Prefixes naming the duration
pub const DURATION_ARG: &str = "duration, d";

/// Used when no duration is given
pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

/// Pauses its queue
#[derive(Debug, Default)]
pub struct WaitCommand;

impl Command for WaitCommand {
    fn parse(&self, entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
        for arg in interpret(entry.arguments()) {
            if entry.has_context_object("duration") {
                return Err(CommandError::InvalidArguments(format!(
                    "Unknown argument '{}'",
                    arg.raw_value
                )));
            }
            if arg.has_prefix() && !arg.matches_prefix(DURATION_ARG) {
                return Err(CommandError::InvalidArguments(format!(
                    "Unknown argument '{}'",
                    arg.raw_value
                )));
            }
            let duration = arg.as_duration().ok_or_else(|| {
                CommandError::InvalidArguments(format!("Invalid duration '{}'", arg.value))
            })?;
            entry.add_object("duration", duration);
        }

        entry.ensure_context_object(
            "duration",
            [Some(ContextValue::Duration(DEFAULT_DURATION))],
        )?;
        Ok(())
    }

    fn execute(&self, entry: &mut ScriptEntry, cx: &CommandContext<'_>) -> CommandResult<()> {
        let duration = entry
            .get_duration("duration")
            .ok_or_else(|| CommandError::MissingArgument("duration".into()))?;

        cx.report(
            entry,
            &debug_obj("Duration", format!("{}ms", duration.as_millis())),
        );

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("no async runtime for WAIT; finishing immediately");
            entry.mark_finished(true);
            return Ok(());
        };

        entry.set_wait_for(true);
        let completion = entry.completion();
        handle.spawn(async move {
            tokio::time::sleep(duration).await;
            completion.mark_finished(true);
        });

        Ok(())
    }
}
