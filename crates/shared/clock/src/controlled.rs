use crate::after;
use crate::config::ClockConfig;
use crate::dispatch::Dispatch;
use crate::lock::ClockLock;
use crate::notifier::{self, Change, Listener};
use crate::sentinel::Sentinel;
use crate::ticker::Ticker;
use crate::timer::Timer;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use testcase_core::{Timeline, Timestamp};
use testcase_ports::Clock;
use tokio::sync::oneshot;

/// Controllable clock - logical time derived from the wall clock
///
/// Reads and waits go through the current [`Timeline`]; control operations
/// (see the `control` module) install a new timeline and wake every waiter
/// so it can recompute its deadline.
///
/// ```text
/// travel / set_speed ──► Timeline (write lock) ──► broadcast
///                                                    │
///                         ┌──────────────────────────┼──────────────┐
///                         ▼                          ▼              ▼
///                       after()                   Ticker          Timer
///                  (re-arm / fire)      (fast-forward / halt)  (via after)
/// ```
///
/// Clones share state. The façade owns one process-wide instance; separate
/// instances are fully independent.
#[derive(Clone)]
pub struct ControlledClock {
    inner: Arc<ClockInner>,
}

struct ClockInner {
    lock: Arc<ClockLock>,
    sentinel: Sentinel,
    config: ClockConfig,
}

impl ControlledClock {
    /// Create an unaltered clock with default configuration
    pub fn new() -> Self {
        Self::with_config(ClockConfig::default())
    }

    pub fn with_config(config: ClockConfig) -> Self {
        Self {
            inner: Arc::new(ClockInner {
                lock: Arc::new(ClockLock::new()),
                sentinel: Sentinel::new(),
                config,
            }),
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.inner.config
    }

    /// Snapshot of the alteration state
    pub fn timeline(&self) -> Timeline {
        self.inner.lock.timeline()
    }

    /// Current logical time
    pub fn now(&self) -> Timestamp {
        self.timeline().now()
    }

    /// Logical time elapsed since `start`
    pub fn since(&self, start: Timestamp) -> chrono::Duration {
        self.now() - start
    }

    /// Register interest in alterations
    pub fn subscribe(&self) -> Listener {
        Listener::register(Arc::clone(&self.inner.lock))
    }

    /// Receiver that yields the logical time once `d` of logical time passed
    ///
    /// Must be called within a tokio runtime.
    pub fn after(&self, d: Duration) -> oneshot::Receiver<Timestamp> {
        after::spawn(self.clone(), d)
    }

    /// Wait for `d` of logical time
    pub async fn sleep(&self, d: Duration) {
        let _ = self.after(d).await;
    }

    /// Periodic ticker with a logical `period`
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn ticker(&self, period: Duration) -> Ticker {
        Ticker::controlled(self.clone(), period, self.inner.config.ticker_capacity)
    }

    /// Single-shot timer firing after `d` of logical time
    pub fn timer(&self, d: Duration) -> Timer {
        Timer::new(Dispatch::Controlled(self.clone()), d)
    }

    /// Name of the scope currently holding the clock, if any
    pub fn held_by(&self) -> Option<String> {
        self.inner.sentinel.holder()
    }

    pub(crate) fn sentinel(&self) -> &Sentinel {
        &self.inner.sentinel
    }

    /// Install the timeline computed by `f` and wake every listener
    ///
    /// `f` receives the current timeline and the wall instant of the
    /// mutation. Returns the timeline that was replaced.
    pub(crate) fn alter(&self, f: impl FnOnce(&Timeline, Timestamp) -> Timeline) -> Timeline {
        // The closure always yields a timeline, so this always installs
        self.try_alter(|tl, wall| Some(f(tl, wall)))
            .unwrap_or_else(|| self.timeline())
    }

    /// Like [`ControlledClock::alter`], but `f` may decline the mutation
    ///
    /// When `f` returns `None` nothing is installed and no listener is woken.
    pub(crate) fn try_alter(
        &self,
        f: impl FnOnce(&Timeline, Timestamp) -> Option<Timeline>,
    ) -> Option<Timeline> {
        let wall = Utc::now();
        let (prior, change, slots) = self.inner.lock.write(|state| {
            let prior = state.timeline;
            let next = f(&prior, wall)?;
            state.timeline = next;
            let change = Change {
                prev: prior.now_at(wall),
                when: next.now_at(wall),
                timeline: next,
            };
            Some((prior, change, state.listeners.snapshot()))
        })?;
        notifier::broadcast(&slots, change);
        Some(prior)
    }

    /// Put back a timeline replaced by an earlier alteration
    pub(crate) fn restore(&self, timeline: Timeline) {
        self.alter(|_, _| timeline);
    }
}

impl Default for ControlledClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ControlledClock {
    fn now(&self) -> Timestamp {
        ControlledClock::now(self)
    }

    fn name(&self) -> &str {
        "ControlledClock"
    }
}
