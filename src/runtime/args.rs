//! Argument interpretation shared by all commands
//!
//! Each raw argument is either a bare value or a `prefix:value` pair.
//! Commands declare the prefixes they recognize as comma-separated synonym
//! lists (`"target, targets, t"`) and match them case-insensitively. The
//! un-split [`Argument::raw_value`] stays available for values that contain
//! a colon of their own.

use std::time::Duration;

/// Length of one tick for `t`-suffixed durations
pub const TICK: Duration = Duration::from_millis(50);

/// One interpreted argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    /// Argument exactly as written
    pub raw_value: String,
    /// Lowercased prefix before the first `:`, if any
    pub prefix: Option<String>,
    /// Value after the prefix, or the whole argument when there is none
    pub value: String,
}

impl Argument {
    /// Split a raw argument into prefix and value.
    ///
    /// A prefix must be non-empty and free of whitespace; otherwise the
    /// whole argument is the value.
    pub fn new(raw: &str) -> Self {
        if let Some((prefix, value)) = raw.split_once(':') {
            if !prefix.is_empty() && !prefix.chars().any(char::is_whitespace) {
                return Self {
                    raw_value: raw.to_string(),
                    prefix: Some(prefix.to_lowercase()),
                    value: value.to_string(),
                };
            }
        }

        Self {
            raw_value: raw.to_string(),
            prefix: None,
            value: raw.to_string(),
        }
    }

    /// Whether the argument carries a prefix
    pub fn has_prefix(&self) -> bool {
        self.prefix.is_some()
    }

    /// Whether the prefix is one of the comma-separated `names`
    pub fn matches_prefix(&self, names: &str) -> bool {
        let Some(prefix) = &self.prefix else {
            return false;
        };
        names
            .split(',')
            .map(str::trim)
            .any(|name| name.eq_ignore_ascii_case(prefix))
    }

    /// Value split on `|` into list items, empty items dropped
    pub fn as_list(&self) -> Vec<String> {
        self.value
            .split('|')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Value parsed as an integer
    pub fn as_integer(&self) -> Option<i64> {
        self.value.trim().parse().ok()
    }

    /// Value parsed as a duration.
    ///
    /// Accepts `ms`, `s`, `m` and `t` (ticks) suffixes; a bare number is
    /// seconds.
    pub fn as_duration(&self) -> Option<Duration> {
        parse_duration(&self.value)
    }
}

/// Parse `500ms`, `2s`, `1.5m`, `20t` or a bare number of seconds
pub fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim().to_ascii_lowercase();
    let (number, unit_millis) = if let Some(n) = text.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = text.strip_suffix('s') {
        (n, 1000.0)
    } else if let Some(n) = text.strip_suffix('m') {
        (n, 60_000.0)
    } else if let Some(n) = text.strip_suffix('t') {
        (n, TICK.as_millis() as f64)
    } else {
        (text.as_str(), 1000.0)
    };

    let value: f64 = number.trim().parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(Duration::from_millis((value * unit_millis).round() as u64))
}

/// Interpret every raw argument in order
pub fn interpret(arguments: &[String]) -> Vec<Argument> {
    arguments.iter().map(|raw| Argument::new(raw)).collect()
}
