//! Typed values carried in an entry's context store
//!
//! The store holds a closed set of variants plus an opaque fallback. Typed
//! accessors on the entry return `None` on a variant mismatch instead of
//! failing.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::actor::ActorRef;
use super::script::ScriptContainer;

/// Plain text value that remembers the key it was stored under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    value: String,
    prefix: Option<String>,
}

impl Element {
    /// Create an element without a prefix
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            prefix: None,
        }
    }

    /// Text content
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Key this element was last stored under
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Debug rendering, `prefix='value'` when a prefix is known
    pub fn debug(&self) -> String {
        debug_with_prefix(self.prefix.as_deref(), &self.value)
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Element {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Element {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Ordered list of text values that remembers the key it was stored under
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValueList {
    items: Vec<String>,
    prefix: Option<String>,
}

impl ValueList {
    /// Create a list without a prefix
    pub fn new(items: Vec<String>) -> Self {
        Self {
            items,
            prefix: None,
        }
    }

    /// List items
    pub fn items(&self) -> &[String] {
        &self.items
    }

    /// Key this list was last stored under
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Debug rendering, `prefix='a|b|c'` when a prefix is known
    pub fn debug(&self) -> String {
        debug_with_prefix(self.prefix.as_deref(), &self.items.join("|"))
    }
}

fn debug_with_prefix(prefix: Option<&str>, value: &str) -> String {
    match prefix {
        Some(prefix) => format!("{}='{}'", prefix, value),
        None => value.to_string(),
    }
}

/// A value stored in an entry's context
#[derive(Clone)]
pub enum ContextValue {
    /// Text
    Element(Element),
    /// List of text values
    List(ValueList),
    /// Single actor handle
    Actor(ActorRef),
    /// List of actor handles
    Actors(Vec<ActorRef>),
    /// Script container reference
    Script(Arc<ScriptContainer>),
    /// Signed integer
    Integer(i64),
    /// Floating point number
    Number(f64),
    /// Boolean flag
    Boolean(bool),
    /// Duration
    Duration(Duration),
    /// Enum-like symbolic constant, reported as its name
    Symbol(String),
    /// Anything else a command wants to carry between phases
    Opaque(Arc<dyn Any + Send + Sync>),
}

impl ContextValue {
    /// Wrap an arbitrary value in the opaque variant
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        ContextValue::Opaque(Arc::new(value))
    }

    /// Record the storage key on values that display one.
    ///
    /// Only [`Element`] and [`ValueList`] carry a display prefix; other
    /// variants ignore it.
    pub fn set_prefix(&mut self, key: &str) {
        match self {
            ContextValue::Element(element) => element.prefix = Some(key.to_string()),
            ContextValue::List(list) => list.prefix = Some(key.to_string()),
            _ => {}
        }
    }

    /// Whether this variant carries a display prefix
    pub fn has_display_prefix(&self) -> bool {
        matches!(self, ContextValue::Element(_) | ContextValue::List(_))
    }

    /// Render scalar variants as text; `None` for compound and opaque values
    pub fn as_text(&self) -> Option<String> {
        match self {
            ContextValue::Element(element) => Some(element.as_str().to_string()),
            ContextValue::Integer(value) => Some(value.to_string()),
            ContextValue::Number(value) => Some(value.to_string()),
            ContextValue::Boolean(value) => Some(value.to_string()),
            ContextValue::Symbol(name) => Some(name.clone()),
            ContextValue::Actor(actor) => Some(actor.name().to_string()),
            ContextValue::Script(script) => Some(script.name().to_string()),
            _ => None,
        }
    }

    /// Debug rendering used by entry reports
    pub fn debug(&self) -> String {
        match self {
            ContextValue::Element(element) => element.debug(),
            ContextValue::List(list) => list.debug(),
            ContextValue::Actor(actor) => actor.to_string(),
            ContextValue::Actors(actors) => format_actor_list(actors),
            ContextValue::Script(script) => script.to_string(),
            ContextValue::Integer(value) => value.to_string(),
            ContextValue::Number(value) => value.to_string(),
            ContextValue::Boolean(value) => value.to_string(),
            ContextValue::Duration(value) => format!("{}ms", value.as_millis()),
            ContextValue::Symbol(name) => name.clone(),
            ContextValue::Opaque(_) => "<opaque>".to_string(),
        }
    }
}

/// Render a list of actor handles as `[a@one, a@two]`
pub fn format_actor_list(actors: &[ActorRef]) -> String {
    let names: Vec<String> = actors.iter().map(|actor| actor.to_string()).collect();
    format!("[{}]", names.join(", "))
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Opaque(_) => f.write_str("Opaque(..)"),
            other => write!(f, "{}", other.debug()),
        }
    }
}

impl From<Element> for ContextValue {
    fn from(value: Element) -> Self {
        ContextValue::Element(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::Element(Element::new(value))
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::Element(Element::new(value))
    }
}

impl From<ValueList> for ContextValue {
    fn from(value: ValueList) -> Self {
        ContextValue::List(value)
    }
}

impl From<ActorRef> for ContextValue {
    fn from(value: ActorRef) -> Self {
        ContextValue::Actor(value)
    }
}

impl From<Vec<ActorRef>> for ContextValue {
    fn from(value: Vec<ActorRef>) -> Self {
        ContextValue::Actors(value)
    }
}

impl From<Arc<ScriptContainer>> for ContextValue {
    fn from(value: Arc<ScriptContainer>) -> Self {
        ContextValue::Script(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Integer(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Boolean(value)
    }
}

impl From<Duration> for ContextValue {
    fn from(value: Duration) -> Self {
        ContextValue::Duration(value)
    }
}
