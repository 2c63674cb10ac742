//! Cadence – execution core for a small scripting engine
//!
//! This crate implements:
//! - Script entries: one parsed command invocation with a typed,
//!   case-insensitive context store and timing flags
//! - Tag resolution of entry arguments before dispatch
//! - A two-phase (parse, execute) command contract and a name-keyed registry
//! - Queues that run entries in order, honoring instant and wait-for timing
//! - A tokio driver for timed queues
//!
//! Script compilation and the host's own actors live outside this crate.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

/// Runtime core: entries, dispatch, queues
pub mod runtime;

/// Bundled command implementations
pub mod commands;

// Re-export key types for convenience
pub use runtime::{Runtime, RuntimeConfig};

/// Current version of the cadence runtime
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
