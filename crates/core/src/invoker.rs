//! Debounced invoker
//!
//! Wraps a callable so that a burst of triggers produces a single call, with
//! the arguments of the last trigger, once `delay` has passed without a new
//! trigger. Each trigger cancels the pending timer and starts a fresh window.

use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

use crate::timer::{Scheduler, TimerHandle};

/// Observable state of an invoker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokerStatus {
    /// No timer pending
    Idle,
    /// A timer is waiting to fire
    Pending,
    /// Torn down; triggers are ignored
    Closed,
}

/// Debounced wrapper around a callable taking `A`
///
/// Several positional arguments are passed as a tuple and forwarded as-is.
/// The target runs on whatever context the scheduler fires timers on.
///
/// Dropping the invoker tears it down.
pub struct DebouncedInvoker<A> {
    inner: Arc<Inner<A>>,
}

struct Inner<A> {
    target: Box<dyn Fn(A) + Send + Sync>,
    scheduler: Arc<dyn Scheduler>,
    slot: Mutex<Slot>,
}

struct Slot {
    delay: Duration,
    /// At most one pending timer per invoker
    pending: Option<PendingTimer>,
    /// Bumped on every trigger; a firing timer must match it
    generation: u64,
    closed: bool,
}

struct PendingTimer {
    handle: TimerHandle,
    generation: u64,
}

impl<A: Send + 'static> DebouncedInvoker<A> {
    /// Create an invoker that calls `target` once `delay` passes without a trigger
    pub fn new<F>(scheduler: Arc<dyn Scheduler>, delay: Duration, target: F) -> Self
    where
        F: Fn(A) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                target: Box::new(target),
                scheduler,
                slot: Mutex::new(Slot {
                    delay,
                    pending: None,
                    generation: 0,
                    closed: false,
                }),
            }),
        }
    }

    /// Request a call with `args`, superseding any pending request
    pub fn trigger(&self, args: A) {
        let mut slot = self.inner.slot.lock();
        if slot.closed {
            debug!("Ignoring trigger on torn-down invoker");
            return;
        }

        if let Some(previous) = slot.pending.take() {
            self.inner.scheduler.cancel(previous.handle);
            trace!("Superseded pending timer (generation {})", previous.generation);
        }

        slot.generation += 1;
        let generation = slot.generation;
        let weak: Weak<Inner<A>> = Arc::downgrade(&self.inner);

        let handle = self.inner.scheduler.schedule(
            slot.delay,
            Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(generation, args);
                }
            }),
        );

        slot.pending = Some(PendingTimer { handle, generation });
        trace!("Scheduled timer (generation {}, delay {:?})", generation, slot.delay);
    }

    /// Cancel the pending timer, if any, without closing the invoker
    pub fn cancel(&self) {
        let mut slot = self.inner.slot.lock();
        if let Some(previous) = slot.pending.take() {
            self.inner.scheduler.cancel(previous.handle);
            debug!("Cancelled pending timer (generation {})", previous.generation);
        }
    }

    /// Change the delay for subsequent triggers
    ///
    /// Any pending timer was armed under the old configuration and is
    /// cancelled first.
    pub fn reconfigure(&self, delay: Duration) {
        self.cancel();
        self.inner.slot.lock().delay = delay;
        debug!("Invoker delay set to {:?}", delay);
    }

    /// Cancel the pending timer and refuse further triggers
    ///
    /// Safe to call more than once.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    /// Whether a timer is waiting to fire
    pub fn is_pending(&self) -> bool {
        self.inner.slot.lock().pending.is_some()
    }

    /// Current state of the invoker
    pub fn status(&self) -> InvokerStatus {
        let slot = self.inner.slot.lock();
        if slot.closed {
            InvokerStatus::Closed
        } else if slot.pending.is_some() {
            InvokerStatus::Pending
        } else {
            InvokerStatus::Idle
        }
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.inner.slot.lock().delay
    }
}

impl<A> Inner<A> {
    fn fire(&self, generation: u64, args: A) {
        {
            let mut slot = self.slot.lock();
            let current = matches!(
                slot.pending,
                Some(ref pending) if pending.generation == generation
            );
            if slot.closed || !current {
                trace!("Dropping stale timer (generation {})", generation);
                return;
            }
            slot.pending = None;
        }

        trace!("Invoking target (generation {})", generation);
        (self.target)(args);
    }

    fn teardown(&self) {
        let mut slot = self.slot.lock();
        if slot.closed {
            return;
        }
        slot.closed = true;

        if let Some(previous) = slot.pending.take() {
            self.scheduler.cancel(previous.handle);
            debug!("Teardown cancelled pending timer (generation {})", previous.generation);
        }
    }
}

impl<A> Drop for DebouncedInvoker<A> {
    fn drop(&mut self) {
        self.inner.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::ManualScheduler;

    const DELAY: Duration = Duration::from_millis(500);
    const SMALL_DELAY: Duration = Duration::from_millis(300);

    type Harness<A> = (Arc<ManualScheduler>, Arc<Mutex<Vec<A>>>, DebouncedInvoker<A>);

    fn setup<A: Send + 'static>() -> Harness<A> {
        let scheduler = Arc::new(ManualScheduler::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let invoker = DebouncedInvoker::new(scheduler.clone(), DELAY, move |args: A| {
            sink.lock().push(args);
        });
        (scheduler, calls, invoker)
    }

    #[test]
    fn test_calls_target_after_delay() {
        let (scheduler, calls, invoker) = setup::<&str>();

        invoker.trigger("test");
        assert!(calls.lock().is_empty());
        assert_eq!(invoker.status(), InvokerStatus::Pending);

        scheduler.advance(DELAY);

        assert_eq!(*calls.lock(), vec!["test"]);
        assert_eq!(invoker.status(), InvokerStatus::Idle);
    }

    #[test]
    fn test_retrigger_restarts_window() {
        let (scheduler, calls, invoker) = setup::<&str>();

        invoker.trigger("first call");
        scheduler.advance(SMALL_DELAY);

        invoker.trigger("second call");
        scheduler.advance(SMALL_DELAY);
        assert!(calls.lock().is_empty());

        scheduler.advance(DELAY - SMALL_DELAY);
        assert_eq!(*calls.lock(), vec!["second call"]);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_teardown_prevents_call() {
        let (scheduler, calls, invoker) = setup::<&str>();

        invoker.trigger("cleanup test");
        invoker.teardown();
        scheduler.advance(DELAY * 4);

        assert!(calls.lock().is_empty());
        assert_eq!(invoker.status(), InvokerStatus::Closed);
    }

    #[test]
    fn test_trigger_after_teardown_is_ignored() {
        let (scheduler, calls, invoker) = setup::<&str>();

        invoker.teardown();
        invoker.teardown();
        invoker.trigger("late");
        scheduler.advance(DELAY);

        assert!(calls.lock().is_empty());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_drop_cancels_pending_timer() {
        let (scheduler, calls, invoker) = setup::<&str>();

        invoker.trigger("dropped");
        drop(invoker);

        assert_eq!(scheduler.pending_count(), 0);
        scheduler.advance(DELAY);
        assert!(calls.lock().is_empty());
    }

    #[test]
    fn test_accepts_struct_argument() {
        #[derive(Debug, Clone, PartialEq)]
        struct Payload {
            foo: String,
        }

        let (scheduler, calls, invoker) = setup::<Payload>();
        invoker.trigger(Payload { foo: "bar".to_string() });
        scheduler.advance(DELAY);

        assert_eq!(*calls.lock(), vec![Payload { foo: "bar".to_string() }]);
    }

    #[test]
    fn test_accepts_multiple_arguments() {
        let scheduler = Arc::new(ManualScheduler::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let invoker =
            DebouncedInvoker::new(scheduler.clone(), DELAY, move |(a, b): (&str, &str)| {
                sink.lock().push(format!("{} {}", a, b));
            });

        invoker.trigger(("foo", "bar"));
        scheduler.advance(DELAY);

        assert_eq!(*calls.lock(), vec!["foo bar".to_string()]);
    }

    #[test]
    fn test_fires_again_after_returning_to_idle() {
        let (scheduler, calls, invoker) = setup::<u32>();

        invoker.trigger(1);
        scheduler.advance(DELAY);
        invoker.trigger(2);
        scheduler.advance(DELAY);

        assert_eq!(*calls.lock(), vec![1, 2]);
    }

    #[test]
    fn test_cancel_keeps_invoker_usable() {
        let (scheduler, calls, invoker) = setup::<u32>();

        invoker.trigger(1);
        invoker.cancel();
        scheduler.advance(DELAY);
        assert!(calls.lock().is_empty());

        invoker.trigger(2);
        scheduler.advance(DELAY);
        assert_eq!(*calls.lock(), vec![2]);
    }

    #[test]
    fn test_reconfigure_cancels_and_applies_new_delay() {
        let (scheduler, calls, invoker) = setup::<u32>();

        invoker.trigger(1);
        invoker.reconfigure(Duration::from_millis(100));
        assert!(!invoker.is_pending());
        assert_eq!(invoker.delay(), Duration::from_millis(100));

        invoker.trigger(2);
        scheduler.advance(Duration::from_millis(100));
        assert_eq!(*calls.lock(), vec![2]);
    }

    #[test]
    fn test_zero_delay_fires_on_next_tick() {
        let scheduler = Arc::new(ManualScheduler::new());
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let invoker = DebouncedInvoker::new(scheduler.clone(), Duration::ZERO, move |v: u32| {
            sink.lock().push(v);
        });

        invoker.trigger(1);
        invoker.trigger(2);
        assert!(calls.lock().is_empty());

        scheduler.advance(Duration::ZERO);
        assert_eq!(*calls.lock(), vec![2]);
    }
}
