//! NARRATE: send a line of text to actors
//!
//! ```text
//! narrate "<text>" (targets:<name>|...) (format:<script>)
//! ```
//!
//! Targets default to the entry's acting subject. A format script wraps the
//! text in its template.

use std::sync::Arc;

use crate::runtime::actor::{ActorRef, ActorResolver};
use crate::runtime::args::interpret;
use crate::runtime::command::{Command, CommandContext};
use crate::runtime::debug::debug_obj;
use crate::runtime::entry::ScriptEntry;
use crate::runtime::error::{CommandError, CommandResult};
use crate::runtime::value::{ContextValue, Element, format_actor_list};

/// Prefixes naming the format script
pub const FORMAT_ARG: &str = "format, f";
/// Prefixes naming the targets
pub const TARGET_ARG: &str = "target, targets, t";

const MAX_ARGUMENTS: usize = 4;

/// Sends text to a list of actors
pub struct NarrateCommand {
    actors: Arc<dyn ActorResolver>,
}

impl NarrateCommand {
    /// Create the command with the host's actor lookup
    pub fn new(actors: Arc<dyn ActorResolver>) -> Self {
        Self { actors }
    }

    fn resolve_targets(&self, names: &[String], cx: &CommandContext<'_>) -> Vec<ActorRef> {
        names
            .iter()
            .filter_map(|name| {
                let actor = self.actors.resolve(name);
                if actor.is_none() {
                    cx.report_error(&format!("Unknown narrate target '{}'", name));
                }
                actor
            })
            .collect()
    }
}

impl Command for NarrateCommand {
    fn parse(&self, entry: &mut ScriptEntry, cx: &CommandContext<'_>) -> CommandResult<()> {
        if entry.arguments().len() > MAX_ARGUMENTS {
            return Err(CommandError::InvalidArguments(
                "Too many arguments! Did you forget a 'quote'?".into(),
            ));
        }

        for arg in interpret(entry.arguments()) {
            if !entry.has_context_object("format") && arg.matches_prefix(FORMAT_ARG) {
                let format = cx.scripts.get_format(&arg.value);
                if format.is_none() {
                    cx.report_error(&format!(
                        "Could not find format script matching '{}'",
                        arg.value
                    ));
                }
                entry.set_context_object("format", format.map(ContextValue::Script));
            } else if arg.matches_prefix(TARGET_ARG) {
                let targets = self.resolve_targets(&arg.as_list(), cx);
                entry.add_object("targets", targets);
            } else if !entry.has_context_object("text") {
                // raw_value keeps anything before a ':' in ordinary text
                entry.add_object("text", Element::new(arg.raw_value));
            }
        }

        if !entry.has_context_object("targets") {
            let subject = entry.subject().cloned();
            entry.set_context_object("targets", subject.map(|s| ContextValue::Actors(vec![s])));
        }

        if !entry.has_context_object("text") {
            return Err(CommandError::InvalidArguments("Missing any text!".into()));
        }

        Ok(())
    }

    fn execute(&self, entry: &mut ScriptEntry, cx: &CommandContext<'_>) -> CommandResult<()> {
        let text = entry
            .get_element("text")
            .map(|text| text.as_str().to_string())
            .ok_or_else(|| CommandError::Execution("NARRATE has no text".into()))?;
        let targets = entry.get_actors("targets").map(<[ActorRef]>::to_vec);
        let format = entry.get_script("format").cloned();

        let mut summary = debug_obj("Narrating", &text);
        summary.push_str(&debug_obj(
            "Targets",
            targets
                .as_deref()
                .map(format_actor_list)
                .unwrap_or_else(|| "none".to_string()),
        ));
        if let Some(format) = &format {
            summary.push_str(&debug_obj("Format", format.name()));
        }
        cx.report(entry, &summary);

        let Some(targets) = targets else {
            return Ok(());
        };

        let message = match &format {
            Some(format) => format.formatted_text(&text),
            None => text,
        };
        for target in &targets {
            match target.get() {
                Some(actor) if actor.is_online() => actor.send_message(&message),
                _ => cx.report_error("Narrated to non-existent or offline actor!"),
            }
        }

        Ok(())
    }
}
