//! Debounced state
//!
//! `DebouncedState` holds two copies of a value:
//! - the live value, updated synchronously by `set_value` and `reset`
//! - the settled value, which catches up with the live value once the delay
//!   passes with no further `set_value`
//!
//! `reset` writes both at once and never notifies the observer.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::{DebounceConfig, DEFAULT_DELAY_MS};
use crate::invoker::DebouncedInvoker;
use crate::timer::Scheduler;

type Observer<T> = Box<dyn Fn(&T) + Send + Sync>;

/// A new value, or a transform of the previous live value
pub enum Update<T> {
    /// Replace the value
    Value(T),
    /// Compute the value from the previous live value
    With(Box<dyn FnOnce(&T) -> T>),
}

impl<T> Update<T> {
    /// Build an update from a transform of the previous live value
    pub fn with<F>(transform: F) -> Self
    where
        F: FnOnce(&T) -> T + 'static,
    {
        Update::With(Box::new(transform))
    }

    fn apply(self, previous: &T) -> T {
        match self {
            Update::Value(value) => value,
            Update::With(transform) => transform(previous),
        }
    }
}

impl<T> From<T> for Update<T> {
    fn from(value: T) -> Self {
        Update::Value(value)
    }
}

enum Initial<T> {
    Value(T),
    Lazy(Box<dyn FnOnce() -> T>),
}

/// Builder for `DebouncedState`
pub struct DebouncedStateBuilder<T> {
    initial: Initial<T>,
    delay: Duration,
    observer: Option<Observer<T>>,
}

impl<T: Clone + Send + 'static> DebouncedStateBuilder<T> {
    /// Quiescence window (default: 500ms)
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Take the delay from a loaded configuration
    pub fn config(self, config: &DebounceConfig) -> Self {
        self.delay(config.delay())
    }

    /// Called with each newly settled value, after it is stored
    pub fn on_settle<F>(mut self, observer: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Build the state, evaluating a lazy initial value now
    pub fn build(self, scheduler: Arc<dyn Scheduler>) -> DebouncedState<T> {
        let seed = match self.initial {
            Initial::Value(value) => value,
            Initial::Lazy(produce) => produce(),
        };

        let shared = Arc::new(Shared {
            values: Mutex::new(Values {
                live: seed.clone(),
                settled: seed,
                seq: 0,
            }),
            observer: self.observer,
        });

        let settle_into = Arc::clone(&shared);
        let invoker = DebouncedInvoker::new(scheduler, self.delay, move |(seq, value): (u64, T)| {
            settle_into.settle(seq, value);
        });

        DebouncedState { shared, invoker }
    }
}

/// Live value plus a debounced, settled copy of it
///
/// Dropping the state cancels any pending settlement.
pub struct DebouncedState<T> {
    shared: Arc<Shared<T>>,
    /// Carries (seq, value); only the settlement for the latest write commits
    invoker: DebouncedInvoker<(u64, T)>,
}

struct Shared<T> {
    values: Mutex<Values<T>>,
    observer: Option<Observer<T>>,
}

struct Values<T> {
    live: T,
    settled: T,
    /// Bumped by every `set_value` and `reset`
    seq: u64,
}

impl<T: Clone> Shared<T> {
    fn settle(&self, seq: u64, value: T) {
        {
            let mut values = self.values.lock();
            if values.seq != seq {
                trace!("Dropping stale settlement (seq {}, current {})", seq, values.seq);
                return;
            }
            values.settled = value.clone();
        }
        trace!("Settled value committed");

        if let Some(ref observer) = self.observer {
            observer(&value);
        }
    }
}

impl<T: Clone + Send + 'static> DebouncedState<T> {
    /// Start building a state seeded with `initial`
    pub fn builder(initial: T) -> DebouncedStateBuilder<T> {
        DebouncedStateBuilder {
            initial: Initial::Value(initial),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            observer: None,
        }
    }

    /// Start building a state seeded by `produce`, which runs once in `build`
    pub fn builder_with<F>(produce: F) -> DebouncedStateBuilder<T>
    where
        F: FnOnce() -> T + 'static,
    {
        DebouncedStateBuilder {
            initial: Initial::Lazy(Box::new(produce)),
            delay: Duration::from_millis(DEFAULT_DELAY_MS),
            observer: None,
        }
    }

    /// State seeded with `initial`, default delay, no observer
    pub fn new(scheduler: Arc<dyn Scheduler>, initial: T) -> Self {
        Self::builder(initial).build(scheduler)
    }

    /// Current live value
    pub fn value(&self) -> T {
        self.shared.values.lock().live.clone()
    }

    /// Current settled value
    pub fn debounced_value(&self) -> T {
        self.shared.values.lock().settled.clone()
    }

    /// Live and settled values read together
    pub fn snapshot(&self) -> (T, T) {
        let values = self.shared.values.lock();
        (values.live.clone(), values.settled.clone())
    }

    /// Update the live value now and schedule it to settle
    ///
    /// A transform runs under the state lock and must not call back into
    /// this state.
    pub fn set_value(&self, update: impl Into<Update<T>>) {
        // Triggered under the lock so concurrent callers arm timers in the
        // same order they wrote the live value
        let mut values = self.shared.values.lock();
        let next = update.into().apply(&values.live);
        values.live = next.clone();
        values.seq += 1;
        self.invoker.trigger((values.seq, next));

        trace!("Live value updated");
    }

    /// Set live and settled values immediately, skipping the delay
    ///
    /// A settlement still pending from an earlier `set_value` is cancelled,
    /// so it can neither overwrite the reset value nor reach the observer.
    pub fn reset(&self, update: impl Into<Update<T>>) {
        let mut values = self.shared.values.lock();
        self.invoker.cancel();

        let next = update.into().apply(&values.live);
        values.live = next.clone();
        values.settled = next;
        values.seq += 1;

        debug!("State reset");
    }

    /// Whether a settlement is pending
    pub fn is_settling(&self) -> bool {
        self.invoker.is_pending()
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.invoker.delay()
    }

    /// Change the delay; a pending settlement is cancelled
    ///
    /// The live value is left as is, so it stays ahead of the settled value
    /// until the next `set_value` or `reset`.
    pub fn set_delay(&self, delay: Duration) {
        self.invoker.reconfigure(delay);
    }

    /// Cancel any pending settlement and stop accepting new ones
    ///
    /// `set_value` still updates the live value afterwards.
    pub fn teardown(&self) {
        self.invoker.teardown();
    }
}
