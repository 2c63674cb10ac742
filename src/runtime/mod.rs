//! Runtime orchestrator and public API
//!
//! This module provides the main `Runtime` struct that owns the command
//! dispatcher and the set of named queues, and exposes the interface hosts
//! embed: build entries, admit them to queues, drive the queues.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

// Submodules
pub mod actor;
pub mod args;
pub mod command;
pub mod config;
pub mod context;
pub mod debug;
pub mod driver;
pub mod entry;
pub mod error;
pub mod executor;
pub mod registry;
pub mod scheduler;
pub mod script;
pub mod tags;
pub mod value;

use debug::{DebugReporter, TracingReporter};
use driver::{SharedQueue, TimedQueue};
use entry::ScriptEntry;
use error::{CommandResult, QueueError, QueueResult, Result};
use executor::CommandExecutor;
use registry::{CommandCatalog, CommandRegistry};
use scheduler::{ExecutionRecord, QueueId, ScriptQueue};
use script::ScriptLibrary;
use tags::{ContextTagResolver, TagResolver};

/// Configuration for the cadence runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Delay between normal entries of a timed queue, in milliseconds
    pub tick_interval_ms: u64,

    /// Emit debug reports
    pub debug: bool,

    /// Only report entries whose script matches one of these names
    pub debug_filters: Vec<String>,

    /// Execution records kept per queue
    pub history_limit: usize,

    /// Let a timed queue's driver exit once the queue drains
    pub stop_when_drained: bool,
}

impl RuntimeConfig {
    /// Delay between normal entries
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            debug: true,
            debug_filters: Vec::new(),
            history_limit: scheduler::DEFAULT_HISTORY_LIMIT,
            stop_when_drained: true,
        }
    }
}

/// The main runtime orchestrator
///
/// Owns the dispatcher (registry snapshot, tag resolver, reporter, script
/// library) and every named queue. Queues run independently; they share
/// nothing but the dispatcher.
pub struct Runtime {
    config: RuntimeConfig,
    registry: CommandRegistry,
    resolver: Arc<dyn TagResolver>,
    reporter: Arc<dyn DebugReporter>,
    scripts: Arc<ScriptLibrary>,
    executor: Arc<CommandExecutor>,
    queues: HashMap<QueueId, SharedQueue>,
}

impl Runtime {
    /// Create a runtime from the global command catalog
    pub fn new(config: RuntimeConfig) -> Self {
        let registry = CommandCatalog::global().snapshot();
        let resolver: Arc<dyn TagResolver> = Arc::new(ContextTagResolver);
        let reporter: Arc<dyn DebugReporter> = Arc::new(TracingReporter::from_config(&config));
        let scripts = Arc::new(ScriptLibrary::new());
        let executor = Arc::new(CommandExecutor::new(
            registry.clone(),
            Arc::clone(&resolver),
            Arc::clone(&reporter),
            Arc::clone(&scripts),
        ));

        Self {
            config,
            registry,
            resolver,
            reporter,
            scripts,
            executor,
            queues: HashMap::new(),
        }
    }

    /// Write `config` to `path`
    pub fn init(path: &Path, config: &RuntimeConfig) -> Result<()> {
        self::config::write_config(path, config)?;
        Ok(())
    }

    /// Create a runtime from a config file
    pub fn load(path: &Path) -> Result<Self> {
        let config = self::config::load_config(path)?;
        Ok(Self::new(config))
    }

    /// Use a specific command registry instead of the global snapshot
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self.rebuild_executor();
        self
    }

    /// Use a specific debug reporter
    pub fn with_reporter(mut self, reporter: Arc<dyn DebugReporter>) -> Self {
        self.reporter = reporter;
        self.rebuild_executor();
        self
    }

    /// Use a specific tag resolver
    pub fn with_resolver(mut self, resolver: Arc<dyn TagResolver>) -> Self {
        self.resolver = resolver;
        self.rebuild_executor();
        self
    }

    /// Use a loaded script library
    pub fn with_scripts(mut self, scripts: ScriptLibrary) -> Self {
        self.scripts = Arc::new(scripts);
        self.rebuild_executor();
        self
    }

    fn rebuild_executor(&mut self) {
        self.executor = Arc::new(CommandExecutor::new(
            self.registry.clone(),
            Arc::clone(&self.resolver),
            Arc::clone(&self.reporter),
            Arc::clone(&self.scripts),
        ));
    }

    /// Get the current configuration
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Get the command registry snapshot
    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Get the script library
    pub fn scripts(&self) -> &ScriptLibrary {
        &self.scripts
    }

    /// Get the shared dispatcher
    pub fn executor(&self) -> Arc<CommandExecutor> {
        Arc::clone(&self.executor)
    }

    /// Create an empty named queue
    pub fn create_queue(&mut self, id: QueueId) -> QueueResult<SharedQueue> {
        if self.queues.contains_key(&id) {
            return Err(QueueError::AlreadyExists(id.to_string()));
        }

        let queue = ScriptQueue::new(id.clone()).with_history_limit(self.config.history_limit);
        let queue = Arc::new(Mutex::new(queue));
        tracing::debug!(queue = %id, "created queue");
        self.queues.insert(id, Arc::clone(&queue));
        Ok(queue)
    }

    /// Look up a queue
    pub fn queue(&self, id: &QueueId) -> QueueResult<SharedQueue> {
        self.queues
            .get(id)
            .cloned()
            .ok_or_else(|| QueueError::NotFound(id.to_string()))
    }

    /// Stop and forget a queue
    pub fn remove_queue(&mut self, id: &QueueId) -> QueueResult<()> {
        let queue = self
            .queues
            .remove(id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        queue.lock().stop();
        Ok(())
    }

    /// Ids of every known queue, sorted
    pub fn queue_ids(&self) -> Vec<QueueId> {
        let mut ids: Vec<QueueId> = self.queues.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        ids
    }

    /// Admit an entry to a queue
    pub fn enqueue(&self, id: &QueueId, entry: ScriptEntry) -> QueueResult<()> {
        let queue = self.queue(id)?;
        let mut queue = queue.lock();
        queue.enqueue(entry)
    }

    /// Run a single entry immediately, outside any queue.
    ///
    /// Unlike queued entries, failures are returned to the caller.
    pub fn execute_now(&self, entry: &mut ScriptEntry) -> CommandResult<()> {
        self.executor.dispatch(entry)
    }

    /// Drive a queue synchronously until it drains or blocks.
    ///
    /// The queue is unlocked while each command runs, so commands may admit
    /// entries into it.
    pub fn run_queue(&self, id: &QueueId) -> QueueResult<Vec<ExecutionRecord>> {
        let queue = self.queue(id)?;
        let mut records = Vec::new();
        while let Tick::Ran(record) = driver::step(&queue, &self.executor) {
            records.push(record);
        }
        Ok(records)
    }

    /// Build a timed driver for a queue using the configured interval
    pub fn timed_queue(&self, id: &QueueId) -> QueueResult<TimedQueue> {
        let queue = self.queue(id)?;
        Ok(
            TimedQueue::new(queue, self.executor(), self.config.tick_interval())
                .stop_when_drained(self.config.stop_when_drained),
        )
    }
}

// Re-export commonly used types
pub use entry::{Completion, EntryId, EnsureOutcome};
pub use error::{CommandError, CreationError, RuntimeError};
pub use scheduler::{QueueState, Tick};
pub use value::{ContextValue, Element, ValueList};
