//! Script containers and the library that names them
//!
//! A container is the compiled source that produced a set of entries. The
//! core only uses it for debug scoping and, for format containers, for
//! rendering text.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::context::normalize_key;

/// What a script container is for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptKind {
    /// Ordinary runnable script
    Task,
    /// Text template; `<text>` is replaced by the narrated text
    Format {
        /// Template text
        template: String,
    },
}

/// A named script container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptContainer {
    name: String,
    debug: bool,
    kind: ScriptKind,
}

impl ScriptContainer {
    /// Create a task script
    pub fn task(name: impl Into<String>) -> Self {
        Self {
            name: normalize_key(&name.into()),
            debug: true,
            kind: ScriptKind::Task,
        }
    }

    /// Create a format script with the given template
    pub fn format(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: normalize_key(&name.into()),
            debug: true,
            kind: ScriptKind::Format {
                template: template.into(),
            },
        }
    }

    /// Set whether entries from this script emit debug reports
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Container name (uppercased)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether entries from this script emit debug reports
    pub fn should_debug(&self) -> bool {
        self.debug
    }

    /// Container kind
    pub fn kind(&self) -> &ScriptKind {
        &self.kind
    }

    /// Whether this is a format script
    pub fn is_format(&self) -> bool {
        matches!(self.kind, ScriptKind::Format { .. })
    }

    /// Render text through this container's template.
    ///
    /// Task containers return the text unchanged.
    pub fn formatted_text(&self, text: &str) -> String {
        match &self.kind {
            ScriptKind::Format { template } => template.replace("<text>", text),
            ScriptKind::Task => text.to_string(),
        }
    }
}

impl fmt::Display for ScriptContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s@{}", self.name)
    }
}

/// Name-indexed set of loaded script containers
#[derive(Debug, Clone, Default)]
pub struct ScriptLibrary {
    scripts: HashMap<String, Arc<ScriptContainer>>,
}

impl ScriptLibrary {
    /// Create an empty library
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a container, replacing any container of the same name
    pub fn insert(&mut self, script: ScriptContainer) -> Arc<ScriptContainer> {
        let script = Arc::new(script);
        self.scripts
            .insert(script.name().to_string(), Arc::clone(&script));
        script
    }

    /// Look up a container by name (case-insensitive, `s@` prefix allowed)
    pub fn get(&self, name: &str) -> Option<Arc<ScriptContainer>> {
        let name = name.strip_prefix("s@").unwrap_or(name);
        self.scripts.get(&normalize_key(name)).cloned()
    }

    /// Look up a format container by name
    pub fn get_format(&self, name: &str) -> Option<Arc<ScriptContainer>> {
        self.get(name).filter(|script| script.is_format())
    }

    /// Number of loaded containers
    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    /// Whether the library is empty
    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case_and_prefix() {
        let mut library = ScriptLibrary::new();
        library.insert(ScriptContainer::task("greeter"));

        assert!(library.get("GREETER").is_some());
        assert!(library.get("s@Greeter").is_some());
        assert!(library.get("farewell").is_none());
    }

    #[test]
    fn test_format_lookup_rejects_tasks() {
        let mut library = ScriptLibrary::new();
        library.insert(ScriptContainer::task("greeter"));
        library.insert(ScriptContainer::format("shout", "[!] <text>"));

        assert!(library.get_format("greeter").is_none());
        let shout = library.get_format("shout").unwrap();
        assert_eq!(shout.formatted_text("hello"), "[!] hello");
    }
}
