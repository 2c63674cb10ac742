//! Integration tests for queue scheduling
//!
//! Drives queues through the runtime with a private command registry: wait-for
//! holds, instant splicing, and per-entry failure handling.

use std::sync::Arc;

use cadence::runtime::command::{Command, CommandContext};
use cadence::runtime::debug::RecordingReporter;
use cadence::runtime::driver::SharedQueue;
use cadence::runtime::entry::ScriptEntry;
use cadence::runtime::error::{CommandError, CommandResult, QueueError};
use cadence::runtime::registry::CommandCatalog;
use cadence::runtime::scheduler::{ExecutionStatus, QueueId, QueueState, Tick};
use cadence::{Runtime, RuntimeConfig};
use parking_lot::Mutex;

/// Records the first argument of every executed entry
struct Record {
    log: Arc<Mutex<Vec<String>>>,
}

impl Command for Record {
    fn parse(&self, entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
        let label = entry
            .arguments()
            .first()
            .cloned()
            .ok_or_else(|| CommandError::InvalidArguments("Missing label!".into()))?;
        entry.add_object("label", label);
        Ok(())
    }

    fn execute(&self, entry: &mut ScriptEntry, cx: &CommandContext<'_>) -> CommandResult<()> {
        let label = entry
            .get_text("label")
            .ok_or_else(|| CommandError::MissingArgument("label".into()))?;
        cx.report(entry, &label);
        self.log.lock().push(label);
        Ok(())
    }
}

struct Harness {
    runtime: Runtime,
    reporter: Arc<RecordingReporter>,
    log: Arc<Mutex<Vec<String>>>,
    id: QueueId,
}

impl Harness {
    fn new() -> Self {
        let log = Arc::new(Mutex::new(Vec::new()));
        let catalog = CommandCatalog::new();
        catalog.register("record", Record { log: log.clone() });

        let reporter = Arc::new(RecordingReporter::new());
        let mut runtime = Runtime::new(RuntimeConfig::default())
            .with_registry(catalog.snapshot())
            .with_reporter(reporter.clone());
        let id = QueueId::new("test");
        runtime.create_queue(id.clone()).unwrap();

        Self {
            runtime,
            reporter,
            log,
            id,
        }
    }

    fn enqueue(&self, command: &str, label: &str) {
        let entry = ScriptEntry::new(command, [label], None).unwrap();
        self.runtime.enqueue(&self.id, entry).unwrap();
    }

    fn tick(&self) -> Tick {
        let queue = self.runtime.queue(&self.id).unwrap();
        let executor = self.runtime.executor();
        let mut queue = queue.lock();
        queue.tick(&executor)
    }

    fn state(&self) -> QueueState {
        self.runtime.queue(&self.id).unwrap().lock().state()
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

#[test]
fn test_wait_for_entry_blocks_until_finished() {
    let harness = Harness::new();
    harness.enqueue("~record", "a");
    harness.enqueue("record", "b");

    let records = harness.runtime.run_queue(&harness.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ExecutionStatus::Waiting);
    assert_eq!(harness.state(), QueueState::AwaitingCompletion);
    assert!(matches!(harness.tick(), Tick::Awaiting(_)));
    assert_eq!(harness.log(), vec!["a"]);

    let completion = harness
        .runtime
        .queue(&harness.id)
        .unwrap()
        .lock()
        .in_flight()
        .unwrap();
    completion.mark_finished(true);

    let records = harness.runtime.run_queue(&harness.id).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(harness.log(), vec!["a", "b"]);
    assert_eq!(harness.state(), QueueState::Drained);
}

#[test]
fn test_instant_entry_runs_before_pending_entries() {
    let harness = Harness::new();
    harness.enqueue("record", "a");
    harness.enqueue("record", "b");

    assert!(matches!(harness.tick(), Tick::Ran(_)));
    harness.enqueue("^record", "c");

    harness.runtime.run_queue(&harness.id).unwrap();
    assert_eq!(harness.log(), vec!["a", "c", "b"]);
}

#[test]
fn test_parse_failure_skips_execute_and_continues() {
    let harness = Harness::new();
    let empty: [&str; 0] = [];
    harness
        .runtime
        .enqueue(&harness.id, ScriptEntry::new("record", empty, None).unwrap())
        .unwrap();
    harness.enqueue("record", "after");

    let records = harness.runtime.run_queue(&harness.id).unwrap();
    assert_eq!(records.len(), 2);
    assert!(matches!(records[0].status, ExecutionStatus::Failed(_)));
    assert_eq!(records[1].status, ExecutionStatus::Completed);

    // Only the second entry reached execute
    assert_eq!(harness.log(), vec!["after"]);
    assert_eq!(harness.reporter.summaries().len(), 1);

    let errors = harness.reporter.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Missing label!"));
}

#[test]
fn test_unknown_command_is_reported() {
    let harness = Harness::new();
    harness.enqueue("teleport", "x");
    harness.enqueue("record", "after");

    harness.runtime.run_queue(&harness.id).unwrap();
    assert_eq!(harness.log(), vec!["after"]);
    assert!(harness.reporter.errors()[0].contains("Unknown command 'TELEPORT'"));
}

#[test]
fn test_stopped_queue_refuses_entries() {
    let mut harness = Harness::new();
    harness.enqueue("record", "a");
    let queue = harness.runtime.queue(&harness.id).unwrap();

    harness.runtime.remove_queue(&harness.id).unwrap();
    let entry = ScriptEntry::new("record", ["b"], None).unwrap();
    assert!(matches!(
        queue.lock().enqueue(entry),
        Err(QueueError::Stopped(_))
    ));
    assert!(harness.log().is_empty());
    assert!(queue.lock().is_empty());
}

/// Admits an instant follow-up into the queue running it
struct Chain {
    log: Arc<Mutex<Vec<String>>>,
    queue: Arc<Mutex<Option<SharedQueue>>>,
}

impl Command for Chain {
    fn parse(&self, _entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
        Ok(())
    }

    fn execute(&self, entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
        let label = entry.arguments().join(" ");
        self.log.lock().push(label.clone());
        if let Some(queue) = self.queue.lock().as_ref() {
            if label == "a" {
                let follow = ScriptEntry::new("^chain", ["c"], None)
                    .map_err(|err| CommandError::Execution(err.to_string()))?;
                queue
                    .lock()
                    .enqueue(follow)
                    .map_err(|err| CommandError::Execution(err.to_string()))?;
            }
        }
        Ok(())
    }
}

#[test]
fn test_command_admits_entries_into_its_own_queue() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let slot = Arc::new(Mutex::new(None));
    let catalog = CommandCatalog::new();
    catalog.register(
        "chain",
        Chain {
            log: log.clone(),
            queue: slot.clone(),
        },
    );

    let mut runtime = Runtime::new(RuntimeConfig::default()).with_registry(catalog.snapshot());
    let id = QueueId::new("chain");
    *slot.lock() = Some(runtime.create_queue(id.clone()).unwrap());
    for label in ["a", "b"] {
        runtime
            .enqueue(&id, ScriptEntry::new("chain", [label], None).unwrap())
            .unwrap();
    }

    let records = runtime.run_queue(&id).unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|record| record.status == ExecutionStatus::Completed));
    assert_eq!(*log.lock(), vec!["a", "c", "b"]);
    assert_eq!(runtime.queue(&id).unwrap().lock().state(), QueueState::Drained);
}

#[test]
fn test_finished_last_entry_leaves_queue_drained() {
    let harness = Harness::new();
    harness.enqueue("~record", "only");

    harness.runtime.run_queue(&harness.id).unwrap();
    assert_eq!(harness.state(), QueueState::AwaitingCompletion);

    let completion = harness
        .runtime
        .queue(&harness.id)
        .unwrap()
        .lock()
        .in_flight()
        .unwrap();
    completion.mark_finished(true);
    assert_eq!(harness.state(), QueueState::Drained);
}
