//! Timer facility
//!
//! Debouncing needs exactly two things from its host: run a task after a
//! delay, and cancel that task. `Scheduler` is that contract. Two clocks
//! implement it:
//! - `TokioScheduler`: tokio timers on a runtime handle
//! - `ManualScheduler`: virtual time that only moves when `advance` is called

use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::Result;

/// Deferred work handed to a scheduler
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Opaque cancellation handle returned by `Scheduler::schedule`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Wrap a scheduler-local timer id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Scheduler-local identifier of the timer
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Host timer facility
///
/// Implementations must guarantee that a cancelled task never executes, and
/// that a task which is not cancelled executes once, no earlier than `delay`
/// after it was scheduled. Cancelling an unknown or already-fired handle is
/// a no-op.
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run after `delay`
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;

    /// Cancel a scheduled task
    fn cancel(&self, handle: TimerHandle);
}

/// Scheduler backed by tokio timers
///
/// Each timer is a spawned task that sleeps, then claims its registry slot
/// before running. `cancel` removes the slot under the same lock, so a task
/// that lost the race to cancellation finds nothing to claim and exits.
pub struct TokioScheduler {
    /// Runtime the timer tasks are spawned on
    runtime: Handle,

    /// Live timers: id -> abort handle
    tasks: Arc<Mutex<HashMap<u64, AbortHandle>>>,

    /// Monotonic id counter
    next_id: AtomicU64,
}

impl TokioScheduler {
    /// Create a scheduler that spawns timers on `runtime`
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Create a scheduler on the runtime of the calling context
    pub fn current() -> Result<Self> {
        Ok(Self::new(Handle::try_current()?))
    }

    /// Number of timers that have neither fired nor been cancelled
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let tasks = Arc::clone(&self.tasks);

        // Held across spawn so the timer cannot look for its slot before it exists
        let mut registry = self.tasks.lock();
        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let claimed = tasks.lock().remove(&id).is_some();
            if claimed {
                trace!("Timer {} fired", id);
                task();
            }
        });
        registry.insert(id, join.abort_handle());

        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some(abort) = self.tasks.lock().remove(&handle.0) {
            abort.abort();
            trace!("Timer {} cancelled", handle.0);
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, abort) in self.tasks.lock().drain() {
            abort.abort();
        }
    }
}

/// Scheduler driven by an explicit virtual clock
///
/// Nothing runs until `advance` is called. Due tasks run in deadline order
/// (ties in scheduling order) on the caller's thread, and the clock reads the
/// task's deadline while it runs. Tasks may schedule further timers; those
/// run within the same `advance` call if they fall due before its target.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Mutex<ManualClock>,
}

#[derive(Default)]
struct ManualClock {
    /// Virtual time elapsed since creation
    now: Duration,
    next_id: u64,
    /// (deadline, id) -> task
    queue: BTreeMap<(Duration, u64), TimerTask>,
    /// id -> deadline, for cancellation
    deadlines: HashMap<u64, Duration>,
}

impl ManualScheduler {
    /// Create a scheduler at virtual time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of timers waiting to fire
    pub fn pending_count(&self) -> usize {
        self.clock.lock().queue.len()
    }

    /// Move the clock forward by `by`, running every task that falls due
    ///
    /// Returns the number of tasks that ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.clock.lock().now + by;
        let mut ran = 0;

        loop {
            // The lock is released before the task runs: tasks schedule and cancel
            let task = {
                let mut clock = self.clock.lock();
                let due = clock
                    .queue
                    .keys()
                    .next()
                    .copied()
                    .filter(|(deadline, _)| *deadline <= target);

                match due {
                    Some(key) => {
                        clock.now = key.0;
                        clock.deadlines.remove(&key.1);
                        clock.queue.remove(&key)
                    }
                    None => {
                        clock.now = target;
                        None
                    }
                }
            };

            match task {
                Some(task) => {
                    task();
                    ran += 1;
                }
                None => break,
            }
        }

        ran
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let mut clock = self.clock.lock();
        let id = clock.next_id;
        clock.next_id += 1;

        let deadline = clock.now + delay;
        clock.queue.insert((deadline, id), task);
        clock.deadlines.insert(id, deadline);

        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let mut clock = self.clock.lock();
        if let Some(deadline) = clock.deadlines.remove(&handle.0) {
            clock.queue.remove(&(deadline, handle.0));
        }
    }
}
