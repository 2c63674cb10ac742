//! Script queue scheduler
//!
//! Owns an ordered sequence of entries and runs them one at a time.
//! Instant entries are spliced ahead of queued normal entries; a wait-for
//! entry holds the queue until its completion signal arrives. Failures are
//! reported per entry and never stop the queue.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use uuid::Uuid;

use super::context::normalize_key;
use super::debug::DebugReporter;
use super::entry::{Completion, EntryId, ScriptEntry};
use super::error::{CommandResult, QueueError, QueueResult};
use super::executor::CommandExecutor;

/// Default number of execution records a queue keeps
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// Queue identifier (uppercased)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueId(String);

impl QueueId {
    /// Create a queue id from a name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(normalize_key(name.as_ref()))
    }

    /// Create a unique generated queue id
    pub fn random() -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self::new(format!("Q_{}", &uuid[..8]))
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observable scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueState {
    /// Nothing queued and nothing run yet
    Idle,
    /// Entries are pending
    Running,
    /// The last entry is waiting for its completion signal
    AwaitingCompletion,
    /// Everything ran (or the queue was cleared) and nothing is in flight
    Drained,
}

/// How an entry's dispatch ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Parse and execute succeeded
    Completed,
    /// Execute succeeded and left wait-for set
    Waiting,
    /// Dispatch failed; the entry was discarded
    Failed(String),
}

/// One line of queue history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Entry that ran
    pub entry: EntryId,
    /// Command name
    pub command: String,
    /// Outcome
    pub status: ExecutionStatus,
    /// When dispatch finished
    pub timestamp: DateTime<Utc>,
}

/// Result of a single scheduler tick
#[derive(Debug)]
pub enum Tick {
    /// An entry was dispatched
    Ran(ExecutionRecord),
    /// The in-flight entry is still waiting; nothing ran
    Awaiting(Completion),
    /// Nothing left to run
    Empty,
    /// Another caller is dispatching this queue's current entry
    Busy,
}

/// Entry claimed for dispatch by [`ScriptQueue::take_next`]
#[derive(Debug)]
pub struct Claimed {
    entry: ScriptEntry,
    generation: u64,
}

impl Claimed {
    /// The claimed entry
    pub fn entry(&self) -> &ScriptEntry {
        &self.entry
    }

    /// The claimed entry, for dispatch
    pub fn entry_mut(&mut self) -> &mut ScriptEntry {
        &mut self.entry
    }
}

/// What [`ScriptQueue::take_next`] handed out
#[derive(Debug)]
pub enum Next {
    /// Dispatch this entry, then hand it back with [`ScriptQueue::finish`]
    Ready(Claimed),
    /// The in-flight entry is still waiting
    Awaiting(Completion),
    /// Nothing left to run
    Empty,
    /// An entry is already claimed
    Busy,
}

/// Ordered queue of script entries
#[derive(Debug)]
pub struct ScriptQueue {
    id: QueueId,
    entries: VecDeque<ScriptEntry>,
    in_flight: Option<ScriptEntry>,
    dispatching: bool,
    generation: u64,
    wake: Arc<Notify>,
    started: bool,
    stopped: bool,
    executed: u64,
    history: VecDeque<ExecutionRecord>,
    history_limit: usize,
}

impl ScriptQueue {
    /// Create an empty queue
    pub fn new(id: QueueId) -> Self {
        Self {
            id,
            entries: VecDeque::new(),
            in_flight: None,
            dispatching: false,
            generation: 0,
            wake: Arc::new(Notify::new()),
            started: false,
            stopped: false,
            executed: 0,
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// Set how many execution records to keep
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Queue id
    pub fn id(&self) -> &QueueId {
        &self.id
    }

    /// Number of pending (not yet dispatched) entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries are pending
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries dispatched so far
    pub fn executed_count(&self) -> u64 {
        self.executed
    }

    /// Whether [`ScriptQueue::stop`] was called
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Current scheduler state
    pub fn state(&self) -> QueueState {
        if let Some(entry) = &self.in_flight {
            if entry.should_wait_for() {
                return QueueState::AwaitingCompletion;
            }
        }

        if self.dispatching || !self.entries.is_empty() {
            QueueState::Running
        } else if self.started || self.stopped {
            QueueState::Drained
        } else {
            QueueState::Idle
        }
    }

    /// Completion handle of the entry currently holding the queue
    pub fn in_flight(&self) -> Option<Completion> {
        self.in_flight
            .as_ref()
            .filter(|entry| entry.should_wait_for())
            .map(ScriptEntry::completion)
    }

    /// Signal fired whenever entries are admitted or the queue is cleared
    /// or stopped. Drivers wait on it between ticks.
    pub fn waker(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Whether the next entry to run is instant
    pub fn peek_is_instant(&self) -> bool {
        self.entries
            .front()
            .map(ScriptEntry::is_instant)
            .unwrap_or(false)
    }

    /// Command names of the pending entries, in run order
    pub fn pending_commands(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|entry| entry.command_name().to_string())
            .collect()
    }

    /// Most recent execution records, oldest first
    pub fn history(&self) -> Vec<ExecutionRecord> {
        self.history.iter().cloned().collect()
    }

    /// Admit an entry.
    ///
    /// Normal entries go to the tail. Instant entries are spliced in ahead
    /// of every pending normal entry, behind instants already waiting.
    pub fn enqueue(&mut self, mut entry: ScriptEntry) -> QueueResult<()> {
        if self.stopped {
            return Err(QueueError::Stopped(self.id.to_string()));
        }

        entry.attach_queue(self.id.clone());
        if entry.is_instant() {
            let position = self
                .entries
                .iter()
                .take_while(|queued| queued.is_instant())
                .count();
            tracing::trace!(queue = %self.id, position, "splicing instant {}", entry.command_name());
            self.entries.insert(position, entry);
        } else {
            self.entries.push_back(entry);
        }
        self.wake.notify_one();
        Ok(())
    }

    /// Admit several entries in order
    pub fn enqueue_all<I>(&mut self, entries: I) -> QueueResult<()>
    where
        I: IntoIterator<Item = ScriptEntry>,
    {
        for entry in entries {
            self.enqueue(entry)?;
        }
        Ok(())
    }

    /// Claim the next entry for dispatch.
    ///
    /// Releases a finished in-flight entry first. While a claimed entry is
    /// out, the queue still accepts entries but hands out nothing else.
    pub fn take_next(&mut self) -> Next {
        if self.dispatching {
            return Next::Busy;
        }

        if let Some(current) = &self.in_flight {
            if current.should_wait_for() {
                return Next::Awaiting(current.completion());
            }
            tracing::debug!(queue = %self.id, entry = %current.id(), "resuming after completion");
            self.in_flight = None;
        }

        let Some(entry) = self.entries.pop_front() else {
            return Next::Empty;
        };
        self.started = true;
        self.dispatching = true;
        Next::Ready(Claimed {
            entry,
            generation: self.generation,
        })
    }

    /// Record the outcome of a claimed entry's dispatch.
    ///
    /// Failures are reported through `reporter`. A wait-for entry becomes
    /// the in-flight entry unless the queue was cleared while it ran.
    pub fn finish(
        &mut self,
        claimed: Claimed,
        result: CommandResult<()>,
        reporter: &dyn DebugReporter,
    ) -> ExecutionRecord {
        let Claimed { entry, generation } = claimed;
        let current = generation == self.generation;
        if current {
            self.dispatching = false;
            self.wake.notify_one();
        }

        let status = match result {
            Ok(()) if entry.should_wait_for() => ExecutionStatus::Waiting,
            Ok(()) => ExecutionStatus::Completed,
            Err(err) => {
                reporter.report_error(&format!(
                    "{} error while running '{}' in queue {}: {}",
                    err.phase(),
                    entry.command_name(),
                    self.id,
                    err
                ));
                ExecutionStatus::Failed(err.to_string())
            }
        };
        self.executed += 1;

        let record = ExecutionRecord {
            entry: entry.id(),
            command: entry.command_name().to_string(),
            status,
            timestamp: Utc::now(),
        };
        self.push_history(record.clone());

        if current && record.status == ExecutionStatus::Waiting {
            tracing::debug!(queue = %self.id, entry = %entry.id(), "awaiting completion of {}", record.command);
            self.in_flight = Some(entry);
        }

        record
    }

    /// Advance by at most one entry, dispatching while `self` is borrowed.
    ///
    /// Commands that admit entries into this same queue during dispatch need
    /// [`super::driver::step`], which releases the queue's lock first.
    pub fn tick(&mut self, executor: &CommandExecutor) -> Tick {
        match self.take_next() {
            Next::Ready(mut claimed) => {
                let result = executor.dispatch(claimed.entry_mut());
                Tick::Ran(self.finish(claimed, result, executor.reporter()))
            }
            Next::Awaiting(completion) => Tick::Awaiting(completion),
            Next::Empty => Tick::Empty,
            Next::Busy => Tick::Busy,
        }
    }

    /// Tick until the queue drains or blocks on a wait-for entry
    pub fn run_until_blocked(&mut self, executor: &CommandExecutor) -> Vec<ExecutionRecord> {
        let mut records = Vec::new();
        while let Tick::Ran(record) = self.tick(executor) {
            records.push(record);
        }
        records
    }

    /// Drop every pending and in-flight entry without executing it.
    ///
    /// The queue can be refilled afterwards. Returns the number of dropped
    /// entries.
    pub fn clear(&mut self) -> usize {
        let dropped = self.entries.len() + usize::from(self.in_flight.is_some());
        self.entries.clear();
        self.in_flight = None;
        self.dispatching = false;
        self.generation += 1;
        self.started = true;
        self.wake.notify_one();
        if dropped > 0 {
            tracing::debug!(queue = %self.id, dropped, "queue cleared");
        }
        dropped
    }

    /// Hard stop: clear, then refuse further entries
    pub fn stop(&mut self) -> usize {
        let dropped = self.clear();
        self.stopped = true;
        tracing::debug!(queue = %self.id, "queue stopped");
        dropped
    }

    fn push_history(&mut self, record: ExecutionRecord) {
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::command::{Command, CommandContext};
    use crate::runtime::debug::RecordingReporter;
    use crate::runtime::error::{CommandError, CommandResult};
    use crate::runtime::registry::CommandCatalog;
    use crate::runtime::script::ScriptLibrary;
    use crate::runtime::tags::NoopResolver;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct Log {
        ran: Arc<Mutex<Vec<String>>>,
    }

    impl Command for Log {
        fn parse(&self, entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
            let label = entry
                .arguments()
                .first()
                .cloned()
                .ok_or_else(|| CommandError::InvalidArguments("Missing label".into()))?;
            entry.add_object("label", label);
            Ok(())
        }

        fn execute(&self, entry: &mut ScriptEntry, _cx: &CommandContext<'_>) -> CommandResult<()> {
            self.ran.lock().push(entry.get_text("label").unwrap_or_default());
            Ok(())
        }
    }

    fn setup() -> (CommandExecutor, Arc<Mutex<Vec<String>>>, Arc<RecordingReporter>) {
        let ran = Arc::new(Mutex::new(Vec::new()));
        let reporter = Arc::new(RecordingReporter::new());
        let catalog = CommandCatalog::new();
        catalog.register("log", Log { ran: ran.clone() });
        let executor = CommandExecutor::new(
            catalog.snapshot(),
            Arc::new(NoopResolver),
            reporter.clone(),
            Arc::new(ScriptLibrary::new()),
        );
        (executor, ran, reporter)
    }

    fn log(label: &str) -> ScriptEntry {
        ScriptEntry::new("log", [label], None).unwrap()
    }

    #[test]
    fn test_state_transitions() {
        let (executor, _ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));
        assert_eq!(queue.state(), QueueState::Idle);

        queue.enqueue(log("a")).unwrap();
        assert_eq!(queue.state(), QueueState::Running);

        queue.run_until_blocked(&executor);
        assert_eq!(queue.state(), QueueState::Drained);

        queue.enqueue(log("b")).unwrap();
        assert_eq!(queue.state(), QueueState::Running);
    }

    #[test]
    fn test_finished_wait_for_entry_drains() {
        let (executor, _ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));

        queue.enqueue(ScriptEntry::new("~log", ["hold"], None).unwrap()).unwrap();
        queue.tick(&executor);
        assert_eq!(queue.state(), QueueState::AwaitingCompletion);

        queue.in_flight().unwrap().mark_finished(true);
        assert_eq!(queue.state(), QueueState::Drained);
        assert!(matches!(queue.tick(&executor), Tick::Empty));
        assert!(queue.in_flight().is_none());
    }

    #[test]
    fn test_claimed_entry_blocks_other_claims() {
        let (executor, ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));
        queue.enqueue(log("a")).unwrap();
        queue.enqueue(log("b")).unwrap();

        let Next::Ready(mut claimed) = queue.take_next() else {
            panic!("expected a claim");
        };
        assert_eq!(queue.state(), QueueState::Running);
        assert!(matches!(queue.take_next(), Next::Busy));

        queue.enqueue(ScriptEntry::new("^log", ["c"], None).unwrap()).unwrap();
        let result = executor.dispatch(claimed.entry_mut());
        let record = queue.finish(claimed, result, executor.reporter());
        assert_eq!(record.status, ExecutionStatus::Completed);

        queue.run_until_blocked(&executor);
        assert_eq!(*ran.lock(), vec!["a", "c", "b"]);
        assert_eq!(queue.state(), QueueState::Drained);
    }

    #[test]
    fn test_clear_during_dispatch_discards_wait_for() {
        let (executor, _ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));
        queue.enqueue(ScriptEntry::new("~log", ["hold"], None).unwrap()).unwrap();

        let Next::Ready(mut claimed) = queue.take_next() else {
            panic!("expected a claim");
        };
        assert_eq!(queue.clear(), 0);
        queue.enqueue(log("after")).unwrap();

        let result = executor.dispatch(claimed.entry_mut());
        let record = queue.finish(claimed, result, executor.reporter());
        assert_eq!(record.status, ExecutionStatus::Waiting);
        assert!(queue.in_flight().is_none());

        assert!(matches!(queue.tick(&executor), Tick::Ran(_)));
        assert_eq!(queue.state(), QueueState::Drained);
    }

    #[test]
    fn test_instants_keep_arrival_order_among_themselves() {
        let (executor, ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));

        queue.enqueue(log("a")).unwrap();
        queue.enqueue(ScriptEntry::new("^log", ["i1"], None).unwrap()).unwrap();
        queue.enqueue(ScriptEntry::new("^log", ["i2"], None).unwrap()).unwrap();
        assert!(queue.peek_is_instant());

        queue.run_until_blocked(&executor);
        assert_eq!(*ran.lock(), vec!["i1", "i2", "a"]);
    }

    #[test]
    fn test_entries_attach_queue_on_admission() {
        let mut queue = ScriptQueue::new(QueueId::new("main"));
        queue.enqueue(log("a")).unwrap();
        assert_eq!(queue.entries[0].residing_queue(), Some(&QueueId::new("MAIN")));
    }

    #[test]
    fn test_failure_is_reported_and_skipped() {
        let (executor, ran, reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));
        let empty: [&str; 0] = [];

        queue.enqueue(ScriptEntry::new("log", empty, None).unwrap()).unwrap();
        queue.enqueue(ScriptEntry::new("fly", ["away"], None).unwrap()).unwrap();
        queue.enqueue(log("ok")).unwrap();

        let records = queue.run_until_blocked(&executor);
        assert_eq!(records.len(), 3);
        assert!(matches!(records[0].status, ExecutionStatus::Failed(_)));
        assert!(matches!(records[1].status, ExecutionStatus::Failed(_)));
        assert_eq!(records[2].status, ExecutionStatus::Completed);
        assert_eq!(*ran.lock(), vec!["ok"]);
        assert_eq!(reporter.errors().len(), 2);
    }

    #[test]
    fn test_failed_wait_for_entry_does_not_block() {
        let (executor, ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));
        let empty: [&str; 0] = [];

        queue.enqueue(ScriptEntry::new("~log", empty, None).unwrap()).unwrap();
        queue.enqueue(log("next")).unwrap();

        queue.run_until_blocked(&executor);
        assert_eq!(*ran.lock(), vec!["next"]);
        assert_eq!(queue.state(), QueueState::Drained);
    }

    #[test]
    fn test_stop_refuses_entries_and_late_signal_is_noop() {
        let (executor, ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main"));

        queue.enqueue(ScriptEntry::new("~log", ["hold"], None).unwrap()).unwrap();
        queue.enqueue(log("never")).unwrap();
        queue.tick(&executor);

        let completion = queue.in_flight().unwrap();
        assert_eq!(queue.stop(), 2);
        assert!(matches!(queue.enqueue(log("late")), Err(QueueError::Stopped(_))));

        completion.mark_finished(true);
        completion.mark_finished(true);
        assert!(matches!(queue.tick(&executor), Tick::Empty));
        assert_eq!(*ran.lock(), vec!["hold"]);
    }

    #[test]
    fn test_history_is_bounded() {
        let (executor, _ran, _reporter) = setup();
        let mut queue = ScriptQueue::new(QueueId::new("main")).with_history_limit(2);
        queue
            .enqueue_all(["a", "b", "c"].into_iter().map(log))
            .unwrap();

        queue.run_until_blocked(&executor);
        assert_eq!(queue.executed_count(), 3);
        assert_eq!(queue.history().len(), 2);
    }
}
