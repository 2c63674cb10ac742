//! Tag resolution at the dispatch boundary
//!
//! The expression grammar belongs to the [`TagResolver`] implementation.
//! The core only decides when resolution runs and what happens on failure:
//! unresolved placeholders stay as written and a warning is reported.

use std::sync::Arc;

use super::actor::ActorRef;
use super::context::ContextStore;
use super::debug::DebugReporter;
use super::entry::ScriptEntry;
use super::error::TagError;
use super::script::ScriptContainer;

/// Substitution environment for one entry
#[derive(Debug, Clone, Copy)]
pub struct TagContext<'a> {
    /// Entry context store
    pub objects: &'a ContextStore,
    /// Acting subject
    pub subject: Option<&'a ActorRef>,
    /// Secondary subject
    pub secondary_subject: Option<&'a ActorRef>,
    /// Source script
    pub script: Option<&'a Arc<ScriptContainer>>,
}

impl<'a> TagContext<'a> {
    /// Environment for `entry` as it stands now
    pub fn for_entry(entry: &'a ScriptEntry) -> Self {
        Self {
            objects: entry.context_objects(),
            subject: entry.subject(),
            secondary_subject: entry.secondary_subject(),
            script: entry.script(),
        }
    }
}

/// Fills placeholders in a single argument
pub trait TagResolver: Send + Sync {
    /// Resolve every placeholder in `argument`.
    ///
    /// Must return the input unchanged when it holds no placeholders.
    fn resolve(&self, argument: &str, context: &TagContext<'_>) -> Result<String, TagError>;
}

/// Resolver that leaves arguments untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResolver;

impl TagResolver for NoopResolver {
    fn resolve(&self, argument: &str, _context: &TagContext<'_>) -> Result<String, TagError> {
        Ok(argument.to_string())
    }
}

const CONTEXT_PREFIX: &str = "context.";

/// Resolver for `<name>` placeholders backed by the entry itself.
///
/// Understands `<subject.name>`, `<secondary.name>`, `<script.name>`, and
/// `<key>` / `<context.key>` for any scalar context object.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextTagResolver;

impl ContextTagResolver {
    fn lookup(&self, tag: &str, context: &TagContext<'_>) -> Option<String> {
        let tag = tag.trim();
        match tag.to_ascii_lowercase().as_str() {
            "subject" | "subject.name" => context.subject.map(|a| a.name().to_string()),
            "secondary" | "secondary.name" => {
                context.secondary_subject.map(|a| a.name().to_string())
            }
            "script" | "script.name" => context.script.map(|s| s.name().to_string()),
            _ => {
                let key = match tag.get(..CONTEXT_PREFIX.len()) {
                    Some(head) if head.eq_ignore_ascii_case(CONTEXT_PREFIX) => {
                        &tag[CONTEXT_PREFIX.len()..]
                    }
                    _ => tag,
                };
                context.objects.get(key).and_then(|value| value.as_text())
            }
        }
    }
}

impl TagResolver for ContextTagResolver {
    fn resolve(&self, argument: &str, context: &TagContext<'_>) -> Result<String, TagError> {
        let mut output = String::with_capacity(argument.len());
        let mut unresolved = Vec::new();
        let mut rest = argument;

        while let Some(open) = rest.find('<') {
            let after = &rest[open + 1..];
            let Some(close) = after.find('>') else {
                break;
            };
            let tag = &after[..close];
            if tag.contains('<') {
                return Err(TagError::Malformed(argument.to_string()));
            }

            output.push_str(&rest[..open]);
            match self.lookup(tag, context) {
                Some(value) => output.push_str(&value),
                None => {
                    let literal = format!("<{}>", tag);
                    output.push_str(&literal);
                    unresolved.push(literal);
                }
            }
            rest = &after[close + 1..];
        }
        output.push_str(rest);

        if unresolved.is_empty() {
            Ok(output)
        } else {
            Err(TagError::Unresolved {
                partial: output,
                tags: unresolved,
            })
        }
    }
}

/// Resolve an entry's working arguments in place.
///
/// Skipped entirely when the entry has no placeholders. Returns the number
/// of arguments that could not be fully resolved.
pub fn resolve_entry(
    entry: &mut ScriptEntry,
    resolver: &dyn TagResolver,
    reporter: &dyn DebugReporter,
) -> usize {
    if !entry.has_tags() {
        return 0;
    }

    let mut failures = 0;
    let resolved: Vec<String> = {
        let context = TagContext::for_entry(entry);
        entry
            .arguments()
            .iter()
            .map(|argument| match resolver.resolve(argument, &context) {
                Ok(value) => value,
                Err(TagError::Unresolved { partial, tags }) => {
                    failures += 1;
                    reporter.report_warning(&format!(
                        "Unable to fill tag(s) {} in '{}'",
                        tags.join(", "),
                        argument
                    ));
                    partial
                }
                Err(err) => {
                    failures += 1;
                    reporter.report_warning(&format!("{} in '{}'", err, argument));
                    argument.clone()
                }
            })
            .collect()
    };

    entry.set_arguments(resolved);
    failures
}
