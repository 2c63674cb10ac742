//! Timed queue driver
//!
//! Advances a shared [`ScriptQueue`] on a tokio task: one entry per tick,
//! a fixed delay before each normal entry, no delay before instant entries,
//! and a suspended loop while a wait-for entry is in flight.
//!
//! The queue's lock is never held while a command runs, so commands may
//! admit entries into the queue that is running them.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::entry::ScriptEntry;
use super::error::QueueResult;
use super::executor::CommandExecutor;
use super::scheduler::{Next, ScriptQueue, Tick};

/// Queue shared between its driver and the host
pub type SharedQueue = Arc<Mutex<ScriptQueue>>;

/// Deadline used when the tick interval does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Advance a shared queue by at most one entry.
///
/// The entry is claimed under the lock, dispatched with the lock released,
/// and its outcome recorded under the lock again.
pub fn step(queue: &SharedQueue, executor: &CommandExecutor) -> Tick {
    let next = queue.lock().take_next();
    match next {
        Next::Ready(mut claimed) => {
            let result = executor.dispatch(claimed.entry_mut());
            let record = queue.lock().finish(claimed, result, executor.reporter());
            Tick::Ran(record)
        }
        Next::Awaiting(completion) => Tick::Awaiting(completion),
        Next::Empty => Tick::Empty,
        Next::Busy => Tick::Busy,
    }
}

fn deadline_after(speed: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(speed)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Drives one queue with a delay between normal entries
#[derive(Clone)]
pub struct TimedQueue {
    queue: SharedQueue,
    executor: Arc<CommandExecutor>,
    speed: Duration,
    stop_when_drained: bool,
    wake: Arc<Notify>,
}

impl TimedQueue {
    /// Create a driver for `queue`
    pub fn new(queue: SharedQueue, executor: Arc<CommandExecutor>, speed: Duration) -> Self {
        let wake = queue.lock().waker();
        Self {
            queue,
            executor,
            speed,
            stop_when_drained: true,
            wake,
        }
    }

    /// Keep the driver alive after the queue drains, waiting for new entries
    pub fn stop_when_drained(mut self, stop: bool) -> Self {
        self.stop_when_drained = stop;
        self
    }

    /// The driven queue
    pub fn queue(&self) -> &SharedQueue {
        &self.queue
    }

    /// Delay before each normal entry
    pub fn speed(&self) -> Duration {
        self.speed
    }

    /// Admit an entry; the queue wakes the driver
    pub fn enqueue(&self, entry: ScriptEntry) -> QueueResult<()> {
        self.queue.lock().enqueue(entry)
    }

    /// Drop pending and in-flight entries; a waiting driver resumes
    pub fn clear(&self) -> usize {
        self.queue.lock().clear()
    }

    /// Hard-stop the queue; the driver exits
    pub fn stop(&self) -> usize {
        self.queue.lock().stop()
    }

    /// Run the driver on the current tokio runtime
    pub fn spawn(self) -> JoinHandle<u64> {
        tokio::spawn(self.run())
    }

    /// Drive the queue until it is stopped (or drained, if configured).
    ///
    /// Returns the number of entries dispatched.
    pub async fn run(self) -> u64 {
        let mut dispatched = 0;
        let mut next_normal: Option<Instant> = None;

        loop {
            let ready = {
                let queue = self.queue.lock();
                if queue.is_stopped() {
                    break;
                }
                let due = next_normal.map(|at| Instant::now() >= at).unwrap_or(true);
                let instant = queue.peek_is_instant();
                (due || instant || queue.in_flight().is_some()).then_some(instant)
            };

            let Some(instant) = ready else {
                if let Some(at) = next_normal {
                    tokio::select! {
                        _ = tokio::time::sleep_until(at) => {}
                        _ = self.wake.notified() => {}
                    }
                }
                continue;
            };

            match step(&self.queue, &self.executor) {
                Tick::Ran(record) => {
                    dispatched += 1;
                    if !instant {
                        next_normal = Some(deadline_after(self.speed));
                    }
                    tracing::trace!(command = %record.command, status = ?record.status, "timed tick");
                }
                Tick::Awaiting(completion) => {
                    // a clear or stop abandons the completion, so the wake
                    // signal must end this wait too
                    tokio::select! {
                        _ = completion.finished() => {}
                        _ = self.wake.notified() => {}
                    }
                }
                Tick::Empty => {
                    if self.stop_when_drained {
                        break;
                    }
                    self.wake.notified().await;
                }
                Tick::Busy => {
                    self.wake.notified().await;
                }
            }
        }

        tracing::debug!(dispatched, "timed queue finished");
        dispatched
    }
}
