//! Debug reporting hook
//!
//! Commands and the scheduler report what they did through a
//! [`DebugReporter`]. Reporting is fire-and-forget and never affects control
//! flow.

use parking_lot::Mutex;
use std::fmt;

use super::RuntimeConfig;
use super::entry::{EntryId, ScriptEntry};

/// Sink for command summaries and errors
pub trait DebugReporter: Send + Sync {
    /// Report what a command did for an entry
    fn report(&self, entry: &ScriptEntry, command: &str, summary: &str);

    /// Report an error
    fn report_error(&self, message: &str);

    /// Report a non-fatal problem
    fn report_warning(&self, message: &str) {
        self.report_error(message)
    }
}

/// Format one `name='value'` pair for a report summary
pub fn debug_obj(name: &str, value: impl fmt::Display) -> String {
    format!("{}='{}'  ", name, value)
}

/// Reporter that emits `tracing` events under the `cadence::debug` target
#[derive(Debug, Clone)]
pub struct TracingReporter {
    enabled: bool,
    filters: Vec<String>,
}

impl TracingReporter {
    /// Create a reporter with debug output on and no filters
    pub fn new() -> Self {
        Self {
            enabled: true,
            filters: Vec::new(),
        }
    }

    /// Create a reporter honoring the runtime's debug settings
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            enabled: config.debug,
            filters: config.debug_filters.clone(),
        }
    }

    fn should_report(&self, entry: &ScriptEntry) -> bool {
        if !self.enabled || !entry.should_debug() {
            return false;
        }
        self.filters.is_empty() || self.filters.iter().any(|f| entry.should_filter(f))
    }
}

impl Default for TracingReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugReporter for TracingReporter {
    fn report(&self, entry: &ScriptEntry, command: &str, summary: &str) {
        if !self.should_report(entry) {
            return;
        }
        tracing::info!(
            target: "cadence::debug",
            entry = %entry.id(),
            queue = entry.residing_queue().map(|q| q.as_str()).unwrap_or("-"),
            "+> Executing '{}': {}",
            command,
            summary.trim_end()
        );
    }

    fn report_error(&self, message: &str) {
        tracing::error!(target: "cadence::debug", "{}", message);
    }

    fn report_warning(&self, message: &str) {
        tracing::warn!(target: "cadence::debug", "{}", message);
    }
}

/// A single captured report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Command summary
    Entry {
        /// Entry that was reported
        entry: EntryId,
        /// Command name
        command: String,
        /// Summary text
        summary: String,
    },
    /// Error message
    Error(String),
    /// Warning message
    Warning(String),
}

/// Reporter that keeps every report in memory
#[derive(Debug, Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// All reports so far, in order
    pub fn reports(&self) -> Vec<Report> {
        self.reports.lock().clone()
    }

    /// Command summaries only
    pub fn summaries(&self) -> Vec<(String, String)> {
        self.reports
            .lock()
            .iter()
            .filter_map(|report| match report {
                Report::Entry {
                    command, summary, ..
                } => Some((command.clone(), summary.clone())),
                _ => None,
            })
            .collect()
    }

    /// Error messages only
    pub fn errors(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|report| match report {
                Report::Error(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Warning messages only
    pub fn warnings(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .filter_map(|report| match report {
                Report::Warning(message) => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Drop all captured reports
    pub fn clear(&self) {
        self.reports.lock().clear();
    }
}

impl DebugReporter for RecordingReporter {
    fn report(&self, entry: &ScriptEntry, command: &str, summary: &str) {
        self.reports.lock().push(Report::Entry {
            entry: entry.id(),
            command: command.to_string(),
            summary: summary.to_string(),
        });
    }

    fn report_error(&self, message: &str) {
        self.reports.lock().push(Report::Error(message.to_string()));
    }

    fn report_warning(&self, message: &str) {
        self.reports.lock().push(Report::Warning(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::script::ScriptContainer;
    use std::sync::Arc;

    #[test]
    fn test_debug_obj_format() {
        assert_eq!(debug_obj("Narrating", "hi"), "Narrating='hi'  ");
    }

    #[test]
    fn test_tracing_reporter_scoping() {
        let quiet = Arc::new(ScriptContainer::task("quiet").with_debug(false));
        let loud = Arc::new(ScriptContainer::task("loud"));
        let quiet_entry = ScriptEntry::new("narrate", ["hi"], Some(quiet)).unwrap();
        let loud_entry = ScriptEntry::new("narrate", ["hi"], Some(loud)).unwrap();

        let reporter = TracingReporter::new();
        assert!(!reporter.should_report(&quiet_entry));
        assert!(reporter.should_report(&loud_entry));

        let config = RuntimeConfig {
            debug_filters: vec!["s@other".into()],
            ..RuntimeConfig::default()
        };
        let filtered = TracingReporter::from_config(&config);
        assert!(!filtered.should_report(&loud_entry));

        let disabled = TracingReporter::from_config(&RuntimeConfig {
            debug: false,
            ..RuntimeConfig::default()
        });
        assert!(!disabled.should_report(&loud_entry));

        let defaulted = TracingReporter::default();
        assert!(defaulted.should_report(&loud_entry));
        assert!(!defaulted.should_report(&quiet_entry));
    }

    #[test]
    fn test_recording_reporter_splits_kinds() {
        let reporter = RecordingReporter::new();
        let entry = ScriptEntry::new("narrate", ["hi"], None).unwrap();

        reporter.report(&entry, "NARRATE", "Narrating='hi'  ");
        reporter.report_error("boom");
        reporter.report_warning("careful");

        assert_eq!(reporter.reports().len(), 3);
        assert_eq!(reporter.summaries(), vec![("NARRATE".to_string(), "Narrating='hi'  ".to_string())]);
        assert_eq!(reporter.errors(), vec!["boom".to_string()]);
        assert_eq!(reporter.warnings(), vec!["careful".to_string()]);
    }
}
