//! Script entries: one parsed command invocation plus its context
//!
//! An entry is built from a command name, raw arguments and an optional
//! source script. The leading sigil on the command name encodes timing:
//! `^` runs the entry instantly, `~` makes the queue wait for a completion
//! signal before advancing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

use super::actor::ActorRef;
use super::context::{ContextStore, normalize_key};
use super::error::{CommandError, CommandResult, CreationError, CreationResult};
use super::scheduler::QueueId;
use super::script::{ScriptContainer, ScriptLibrary};
use super::value::{ContextValue, Element, ValueList};

const INSTANT_SIGIL: char = '^';
const WAIT_FOR_SIGIL: char = '~';

/// Unique identifier for a script entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Create a new random EntryId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
struct CompletionState {
    waiting: AtomicBool,
    notify: Notify,
}

/// Completion signal for a wait-for entry.
///
/// Clones share state with the entry they came from, so host code can hold
/// one across threads or tasks and call [`Completion::mark_finished`] later.
/// Signalling is idempotent and stays harmless after the entry is gone.
#[derive(Debug, Clone)]
pub struct Completion {
    state: Arc<CompletionState>,
}

impl Completion {
    fn new(waiting: bool) -> Self {
        Self {
            state: Arc::new(CompletionState {
                waiting: AtomicBool::new(waiting),
                notify: Notify::new(),
            }),
        }
    }

    /// Whether the entry is still waiting to be finished
    pub fn is_waiting(&self) -> bool {
        self.state.waiting.load(Ordering::Acquire)
    }

    fn set_waiting(&self, waiting: bool) {
        self.state.waiting.store(waiting, Ordering::Release);
    }

    /// Mark the entry finished (clears wait-for) or unfinished (sets it)
    pub fn mark_finished(&self, finished: bool) {
        self.set_waiting(!finished);
        if finished {
            self.state.notify.notify_one();
        }
    }

    /// Resolve once the entry is no longer waiting
    pub async fn finished(&self) {
        while self.is_waiting() {
            self.state.notify.notified().await;
        }
    }
}

/// Whether [`ScriptEntry::ensure_context_object`] kept or filled a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The key was already present
    Existing,
    /// The key was filled from a candidate
    Defaulted,
}

/// A single command invocation
///
/// Duplication ([`ScriptEntry::duplicate`]) ownership:
///
/// | field                 | duplicate gets                         |
/// |-----------------------|----------------------------------------|
/// | original arguments    | shared (immutable)                     |
/// | source script         | shared                                 |
/// | working arguments     | fresh copy of the original arguments   |
/// | context store         | independent copy                       |
/// | tracked object keys   | independent copy                       |
/// | subjects              | same handles                           |
/// | timing flags          | same values, independent signal        |
/// | residing queue        | unset                                  |
/// | id                    | new                                    |
pub struct ScriptEntry {
    id: EntryId,
    command: String,
    arguments: Vec<String>,
    original_arguments: Arc<[String]>,
    has_tags: bool,
    instant: bool,
    completion: Completion,
    objects: ContextStore,
    tracked_objects: Vec<String>,
    subject: Option<ActorRef>,
    secondary_subject: Option<ActorRef>,
    script: Option<Arc<ScriptContainer>>,
    residing_queue: Option<QueueId>,
}

impl ScriptEntry {
    /// Build an entry from a command name, raw arguments and an optional
    /// source script.
    ///
    /// Entries created without a script are ad hoc (e.g. run directly from a
    /// console) and always emit debug output.
    pub fn new<I, S>(
        command: &str,
        arguments: I,
        script: Option<Arc<ScriptContainer>>,
    ) -> CreationResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if command.is_empty() {
            return Err(CreationError::EmptyCommand);
        }

        let (name, instant, wait_for) = match command.chars().next() {
            Some(INSTANT_SIGIL) => (&command[INSTANT_SIGIL.len_utf8()..], true, false),
            Some(WAIT_FOR_SIGIL) => (&command[WAIT_FOR_SIGIL.len_utf8()..], false, true),
            _ => (command, false, false),
        };
        if name.is_empty() {
            return Err(CreationError::SigilOnly(command.to_string()));
        }

        let arguments: Vec<String> = arguments.into_iter().map(Into::into).collect();
        let has_tags = arguments
            .iter()
            .any(|arg| arg.contains('<') && arg.contains('>'));

        Ok(Self {
            id: EntryId::new(),
            command: normalize_key(name),
            original_arguments: arguments.clone().into(),
            arguments,
            has_tags,
            instant,
            completion: Completion::new(wait_for),
            objects: ContextStore::new(),
            tracked_objects: Vec::new(),
            subject: None,
            secondary_subject: None,
            script,
            residing_queue: None,
        })
    }

    /// Unique id of this entry
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Normalized (uppercase) command name
    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Overwrite the command name
    pub fn set_command_name(&mut self, name: &str) -> &mut Self {
        self.command = normalize_key(name);
        self
    }

    /// Working arguments (tag-resolved once dispatch has begun)
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Replace the working arguments; the originals are untouched
    pub fn set_arguments(&mut self, arguments: Vec<String>) -> &mut Self {
        self.arguments = arguments;
        self
    }

    /// Arguments exactly as constructed, before any tag filling
    pub fn original_arguments(&self) -> &[String] {
        &self.original_arguments
    }

    /// Re-derive the working arguments from the originals
    pub fn reset_arguments(&mut self) -> &mut Self {
        self.arguments = self.original_arguments.to_vec();
        self
    }

    /// Whether any raw argument contains a placeholder
    pub fn has_tags(&self) -> bool {
        self.has_tags
    }

    // Context store

    /// Store a value under `key`; `None` leaves the store untouched
    pub fn set_context_object(
        &mut self,
        key: &str,
        value: impl Into<Option<ContextValue>>,
    ) -> &mut Self {
        if let Some(value) = value.into() {
            self.objects.insert(key, value);
        }
        self
    }

    /// Store a value under `key`
    pub fn add_object(&mut self, key: &str, value: impl Into<ContextValue>) -> &mut Self {
        self.objects.insert(key, value.into());
        self
    }

    /// Fill `key` from the first present candidate if it is not set yet.
    ///
    /// Fails with [`CommandError::MissingArgument`] if the key is still
    /// absent afterwards.
    pub fn ensure_context_object<I>(&mut self, key: &str, candidates: I) -> CommandResult<EnsureOutcome>
    where
        I: IntoIterator<Item = Option<ContextValue>>,
    {
        if self.has_context_object(key) {
            return Ok(EnsureOutcome::Existing);
        }

        if let Some(value) = candidates.into_iter().flatten().next() {
            self.objects.insert(key, value);
            return Ok(EnsureOutcome::Defaulted);
        }

        Err(CommandError::MissingArgument(key.to_string()))
    }

    /// Look up a context value
    pub fn get_context_object(&self, key: &str) -> Option<&ContextValue> {
        self.objects.get(key)
    }

    /// Whether a context value is present
    pub fn has_context_object(&self, key: &str) -> bool {
        self.objects.contains(key)
    }

    /// Remove a context value
    pub fn remove_context_object(&mut self, key: &str) -> Option<ContextValue> {
        self.objects.remove(key)
    }

    /// The whole context store
    pub fn context_objects(&self) -> &ContextStore {
        &self.objects
    }

    /// Text element under `key`
    pub fn get_element(&self, key: &str) -> Option<&Element> {
        match self.objects.get(key)? {
            ContextValue::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Any scalar value under `key`, rendered as text
    pub fn get_text(&self, key: &str) -> Option<String> {
        self.objects.get(key)?.as_text()
    }

    /// Text list under `key`
    pub fn get_list(&self, key: &str) -> Option<&ValueList> {
        match self.objects.get(key)? {
            ContextValue::List(list) => Some(list),
            _ => None,
        }
    }

    /// Single actor under `key`
    pub fn get_actor(&self, key: &str) -> Option<&ActorRef> {
        match self.objects.get(key)? {
            ContextValue::Actor(actor) => Some(actor),
            _ => None,
        }
    }

    /// Actor list under `key`
    pub fn get_actors(&self, key: &str) -> Option<&[ActorRef]> {
        match self.objects.get(key)? {
            ContextValue::Actors(actors) => Some(actors),
            _ => None,
        }
    }

    /// Script container under `key`
    pub fn get_script(&self, key: &str) -> Option<&Arc<ScriptContainer>> {
        match self.objects.get(key)? {
            ContextValue::Script(script) => Some(script),
            _ => None,
        }
    }

    /// Integer under `key`
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        match self.objects.get(key)? {
            ContextValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Duration under `key`
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        match self.objects.get(key)? {
            ContextValue::Duration(value) => Some(*value),
            _ => None,
        }
    }

    /// Opaque value under `key`, if it has type `T`
    pub fn get_opaque<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        match self.objects.get(key)? {
            ContextValue::Opaque(value) => value.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Remember `key` so branching commands can inject it into new entries
    pub fn track_object(&mut self, key: &str) -> &mut Self {
        let key = normalize_key(key);
        if !self.tracked_objects.contains(&key) {
            self.tracked_objects.push(key);
        }
        self
    }

    /// Keys recorded with [`ScriptEntry::track_object`]
    pub fn tracked_objects(&self) -> &[String] {
        &self.tracked_objects
    }

    /// Copy every tracked object of this entry into `target`
    pub fn inject_tracked(&self, target: &mut ScriptEntry) {
        for key in &self.tracked_objects {
            if let Some(value) = self.objects.get(key) {
                target.objects.insert(key, value.clone());
                target.track_object(key);
            }
        }
    }

    /// Debug rendering of one context object; empty when absent
    pub fn report_object(&self, key: &str) -> String {
        match self.objects.get(key) {
            Some(value) if value.has_display_prefix() => value.debug(),
            Some(value) => format!("{}='{}'", key, value.debug()),
            None => String::new(),
        }
    }

    // Linked subjects

    /// Acting subject (e.g. the player who triggered the script)
    pub fn subject(&self) -> Option<&ActorRef> {
        self.subject.as_ref()
    }

    /// Whether an acting subject is attached
    pub fn has_subject(&self) -> bool {
        self.subject.is_some()
    }

    /// Attach or clear the acting subject
    pub fn set_subject(&mut self, subject: Option<ActorRef>) -> &mut Self {
        self.subject = subject;
        self
    }

    /// Secondary subject (e.g. the NPC the script is attached to)
    pub fn secondary_subject(&self) -> Option<&ActorRef> {
        self.secondary_subject.as_ref()
    }

    /// Whether a secondary subject is attached
    pub fn has_secondary_subject(&self) -> bool {
        self.secondary_subject.is_some()
    }

    /// Attach or clear the secondary subject
    pub fn set_secondary_subject(&mut self, subject: Option<ActorRef>) -> &mut Self {
        self.secondary_subject = subject;
        self
    }

    /// Source script, absent for ad hoc entries
    pub fn script(&self) -> Option<&Arc<ScriptContainer>> {
        self.script.as_ref()
    }

    /// Attach or clear the source script
    pub fn set_script(&mut self, script: Option<Arc<ScriptContainer>>) -> &mut Self {
        self.script = script;
        self
    }

    /// Attach the named script from `library`; returns whether it was found
    pub fn set_script_by_name(&mut self, library: &ScriptLibrary, name: &str) -> bool {
        match library.get(name) {
            Some(script) => {
                self.script = Some(script);
                true
            }
            None => false,
        }
    }

    /// Queue this entry was admitted to
    pub fn residing_queue(&self) -> Option<&QueueId> {
        self.residing_queue.as_ref()
    }

    /// Record the owning queue. Only the first call takes effect.
    pub fn attach_queue(&mut self, queue: QueueId) -> bool {
        if self.residing_queue.is_some() {
            return false;
        }
        self.residing_queue = Some(queue);
        true
    }

    // Timing

    /// Whether the entry runs ahead of queued normal entries
    pub fn is_instant(&self) -> bool {
        self.instant
    }

    /// Set the instant flag
    pub fn set_instant(&mut self, instant: bool) -> &mut Self {
        self.instant = instant;
        self
    }

    /// Whether the queue must wait for a completion signal
    pub fn should_wait_for(&self) -> bool {
        self.completion.is_waiting()
    }

    /// Set the wait-for flag
    pub fn set_wait_for(&mut self, wait_for: bool) -> &mut Self {
        self.completion.set_waiting(wait_for);
        self
    }

    /// Clear (`true`) or set (`false`) the wait-for flag
    pub fn mark_finished(&self, finished: bool) {
        self.completion.mark_finished(finished);
    }

    /// Handle for signalling completion from outside the queue
    pub fn completion(&self) -> Completion {
        self.completion.clone()
    }

    // Debug scoping

    /// Whether reports for this entry should be emitted
    pub fn should_debug(&self) -> bool {
        self.script
            .as_ref()
            .map(|script| script.should_debug())
            .unwrap_or(true)
    }

    /// Whether this entry's script matches a debug filter
    pub fn should_filter(&self, criteria: &str) -> bool {
        let criteria = criteria.strip_prefix("s@").unwrap_or(criteria);
        self.script
            .as_ref()
            .map(|script| script.name().eq_ignore_ascii_case(criteria))
            .unwrap_or(false)
    }

    /// Copy for reuse, e.g. once per loop iteration.
    ///
    /// See the type-level table for which fields are shared.
    pub fn duplicate(&self) -> Self {
        Self {
            id: EntryId::new(),
            command: self.command.clone(),
            arguments: self.original_arguments.to_vec(),
            original_arguments: Arc::clone(&self.original_arguments),
            has_tags: self.has_tags,
            instant: self.instant,
            completion: Completion::new(self.completion.is_waiting()),
            objects: self.objects.clone(),
            tracked_objects: self.tracked_objects.clone(),
            subject: self.subject.clone(),
            secondary_subject: self.secondary_subject.clone(),
            script: self.script.clone(),
            residing_queue: None,
        }
    }
}

impl fmt::Debug for ScriptEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEntry")
            .field("id", &self.id)
            .field("command", &self.command)
            .field("arguments", &self.arguments)
            .field("instant", &self.instant)
            .field("wait_for", &self.should_wait_for())
            .field("objects", &self.objects)
            .finish()
    }
}
