//! Case-insensitive context store
//!
//! Every key that crosses a boundary (command names, context keys, queue and
//! script names) goes through [`normalize_key`].

use std::collections::HashMap;

use super::value::ContextValue;

/// Canonical form of a key: uppercased
pub fn normalize_key(key: &str) -> String {
    key.to_uppercase()
}

/// Objects passed between a command's parse and execute phases
#[derive(Debug, Clone, Default)]
pub struct ContextStore {
    objects: HashMap<String, ContextValue>,
}

impl ContextStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a value, recording the key as its display prefix
    pub fn insert(&mut self, key: &str, mut value: ContextValue) {
        if value.has_display_prefix() {
            value.set_prefix(key);
        }
        self.objects.insert(normalize_key(key), value);
    }

    /// Look up a value
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.objects.get(&normalize_key(key))
    }

    /// Whether a value is present
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(&normalize_key(key))
    }

    /// Remove a value, returning it
    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.objects.remove(&normalize_key(key))
    }

    /// Stored keys (normalized)
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(|key| key.as_str())
    }

    /// Iterate over all stored values
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.objects.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Number of stored values
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
