//! Error types for the cadence runtime
//!
//! Domain errors use thiserror, one enum per concern, with conversions into
//! the top-level [`RuntimeError`] at orchestration boundaries.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level runtime error
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Entry construction errors
    #[error("Creation error: {0}")]
    Creation(#[from] CreationError),

    /// Command parse/execute errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Queue management errors
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Malformed script entry construction
#[derive(Debug, Error)]
pub enum CreationError {
    /// The command name was empty
    #[error("Command name cannot be empty")]
    EmptyCommand,

    /// The command name held nothing but a timing sigil
    #[error("Command name '{0}' has no name after its timing sigil")]
    SigilOnly(String),
}

/// Convenience result alias for entry construction
pub type CreationResult<T> = std::result::Result<T, CreationError>;

/// Per-entry failures raised while dispatching a command
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// Parse-phase validation failed
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A required context object could not be filled
    #[error("Missing '{0}' argument!")]
    MissingArgument(String),

    /// No command is registered under this name
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),

    /// Execute-phase failure
    #[error("Execution failed: {0}")]
    Execution(String),
}

impl CommandError {
    /// Whether this error belongs to the invalid-arguments family.
    ///
    /// Missing arguments and unknown commands are treated the same way as a
    /// failed parse: the entry is discarded before `execute` runs.
    pub fn is_invalid_arguments(&self) -> bool {
        matches!(
            self,
            CommandError::InvalidArguments(_)
                | CommandError::MissingArgument(_)
                | CommandError::UnknownCommand(_)
        )
    }

    /// Phase label used in error reports
    pub fn phase(&self) -> &'static str {
        match self {
            CommandError::UnknownCommand(_) => "dispatch",
            CommandError::InvalidArguments(_) | CommandError::MissingArgument(_) => "parse",
            CommandError::Execution(_) => "execute",
        }
    }
}

/// Convenience result alias for command operations
pub type CommandResult<T> = std::result::Result<T, CommandError>;

/// Queue management errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Queue not found
    #[error("Queue '{0}' not found")]
    NotFound(String),

    /// Queue already exists
    #[error("Queue '{0}' already exists")]
    AlreadyExists(String),

    /// Queue was stopped and no longer accepts entries
    #[error("Queue '{0}' has been stopped")]
    Stopped(String),
}

/// Convenience result alias for queue operations
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Configuration persistence errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Atomic write failed
    #[error("Atomic write failed for {path}: {detail}")]
    AtomicWriteFailed {
        /// Path where write failed
        path: PathBuf,
        /// Error details
        detail: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Tag resolution failures; never fatal to an entry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// Some placeholders could not be resolved
    #[error("Unresolved tags {tags:?}")]
    Unresolved {
        /// Argument text with every resolvable tag filled in
        partial: String,
        /// Placeholder expressions left as written
        tags: Vec<String>,
    },

    /// The argument could not be read as tag syntax at all
    #[error("Malformed tag expression: {0}")]
    Malformed(String),
}

/// Result type using RuntimeError
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_argument_family() {
        assert!(CommandError::MissingArgument("text".into()).is_invalid_arguments());
        assert!(CommandError::UnknownCommand("FLY".into()).is_invalid_arguments());
        assert!(!CommandError::Execution("boom".into()).is_invalid_arguments());
    }

    #[test]
    fn test_missing_argument_message() {
        let err = CommandError::MissingArgument("format".into());
        assert_eq!(err.to_string(), "Missing 'format' argument!");
        assert_eq!(err.phase(), "parse");
    }
}
