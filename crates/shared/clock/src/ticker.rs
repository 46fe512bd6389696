//! Periodic ticks on logical time
//!
//! The controlled worker reacts to three inputs: stop, clock alterations,
//! and its own wall timer. A forward travel that crosses tick boundaries
//! is filled in with fast-forward ticks, emitted by a helper task so that
//! the next alteration can preempt them. Under deep freeze the worker
//! ignores wall time until an alteration lifts it.

use crate::controlled::ControlledClock;
use crate::notifier::{Change, Listener};
use chrono::Utc;
use log::trace;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;
use testcase_core::{Timestamp, shift, to_std};
use tokio::sync::{Notify, mpsc, oneshot};
use tokio::task::JoinHandle;

/// Floor for a scaled wall wait
const MIN_WAIT: Duration = Duration::from_nanos(1);

/// Period and phase shared between the handle and its worker
struct TickerState {
    period: RwLock<Duration>,
    last: RwLock<Timestamp>,
    reset: Notify,
}

impl TickerState {
    fn period(&self) -> Duration {
        *self.period.read()
    }

    fn last(&self) -> Timestamp {
        *self.last.read()
    }

    fn set_last(&self, at: Timestamp) {
        *self.last.write() = at;
    }
}

/// Ticker delivering the time of each tick at a fixed logical period
///
/// The output channel stays open after [`Ticker::stop`], so a reader never
/// observes a spurious value from a stopped ticker; it simply gets no more
/// ticks. Dropping the ticker stops it.
pub struct Ticker {
    rx: mpsc::Receiver<Timestamp>,
    // Keep sender alive to prevent channel from closing
    _tx: mpsc::Sender<Timestamp>,
    state: Arc<TickerState>,
    done: Mutex<Option<oneshot::Sender<()>>>,
}

impl Ticker {
    fn start(period: Duration, capacity: usize, now: Timestamp) -> (Self, TickerParts) {
        assert!(!period.is_zero(), "ticker period must be non-zero");

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let (done_tx, done_rx) = oneshot::channel();
        let state = Arc::new(TickerState {
            period: RwLock::new(period),
            last: RwLock::new(now),
            reset: Notify::new(),
        });

        let ticker = Self {
            rx,
            _tx: tx.clone(),
            state: Arc::clone(&state),
            done: Mutex::new(Some(done_tx)),
        };
        let parts = TickerParts {
            out: tx,
            state,
            done: done_rx,
        };
        (ticker, parts)
    }

    pub(crate) fn controlled(clock: ControlledClock, period: Duration, capacity: usize) -> Self {
        let (ticker, parts) = Self::start(period, capacity, clock.now());
        let listener = clock.subscribe();
        let worker = ControlledWorker {
            clock,
            listener,
            parts,
            emitter: None,
        };
        tokio::spawn(worker.run());
        ticker
    }

    pub(crate) fn native(period: Duration, capacity: usize) -> Self {
        let (ticker, parts) = Self::start(period, capacity, Utc::now());
        tokio::spawn(run_native(parts));
        ticker
    }

    /// Wait for the next tick
    ///
    /// Never resolves once the ticker is stopped and drained.
    pub async fn recv(&mut self) -> Timestamp {
        match self.rx.recv().await {
            Some(at) => at,
            None => std::future::pending().await,
        }
    }

    /// Take a pending tick without waiting
    pub fn try_recv(&mut self) -> Option<Timestamp> {
        self.rx.try_recv().ok()
    }

    pub fn period(&self) -> Duration {
        self.state.period()
    }

    /// Change the period; the next tick comes one new period from now
    ///
    /// # Panics
    /// Panics if `period` is zero.
    pub fn reset(&self, period: Duration) {
        assert!(!period.is_zero(), "ticker period must be non-zero");
        *self.state.period.write() = period;
        self.state.reset.notify_one();
    }

    /// Stop the worker; calling it again is a no-op
    pub fn stop(&self) {
        self.done.lock().take();
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Worker side of a ticker
struct TickerParts {
    out: mpsc::Sender<Timestamp>,
    state: Arc<TickerState>,
    done: oneshot::Receiver<()>,
}

struct ControlledWorker {
    clock: ControlledClock,
    listener: Listener,
    parts: TickerParts,
    emitter: Option<JoinHandle<()>>,
}

/// What the worker does after handling an alteration
#[derive(Clone, Copy)]
enum Resume {
    After(Duration),
    Halt,
}

impl ControlledWorker {
    fn full_wait(&self) -> Duration {
        self.clock
            .timeline()
            .scaled(self.parts.state.period())
            .max(MIN_WAIT)
    }

    async fn run(mut self) {
        let mut resume = if self.clock.timeline().is_deep_frozen() {
            Resume::Halt
        } else {
            Resume::After(self.full_wait())
        };

        loop {
            let wait = match resume {
                Resume::After(wait) => wait,
                Resume::Halt => {
                    trace!("ticker: deep-frozen, halted");
                    tokio::select! {
                        _ = &mut self.parts.done => break,
                        change = self.listener.changed() => resume = self.on_travel(change),
                    }
                    continue;
                }
            };

            tokio::select! {
                _ = &mut self.parts.done => break,
                _ = self.parts.state.reset.notified() => {
                    resume = Resume::After(self.full_wait());
                }
                change = self.listener.changed() => {
                    resume = self.on_travel(change);
                }
                _ = tokio::time::sleep(wait) => {
                    let at = self.clock.now();
                    self.parts.state.set_last(at);
                    resume = Resume::After(self.full_wait());

                    // The send yields to alterations that arrive before the reader
                    tokio::select! {
                        _ = &mut self.parts.done => break,
                        _ = self.parts.out.send(at) => {}
                        change = self.listener.changed() => {
                            resume = self.on_travel(change);
                        }
                    }
                }
            }
        }

        self.preempt_emitter();
        self.listener.deregister();
        trace!("ticker: stopped");
    }

    fn preempt_emitter(&mut self) {
        if let Some(emitter) = self.emitter.take() {
            emitter.abort();
        }
    }

    /// Catch up on ticks skipped by a forward travel and re-phase the timer
    fn on_travel(&mut self, change: Change) -> Resume {
        self.preempt_emitter();

        let state = &self.parts.state;
        let period = state.period();
        let last = state.last();
        let from = change.prev.min(last);
        let traveled = change.when - from;

        if traveled > chrono::Duration::zero() {
            let missing = (to_std(traveled).as_nanos() / period.as_nanos()) as u64;
            if missing > 0 {
                trace!("ticker: fast-forwarding {missing} tick(s) of {period:?}");
                state.set_last(shift(last, periods(period, missing)));
                self.emitter = Some(tokio::spawn(emit_fast_forward(
                    self.parts.out.clone(),
                    from,
                    period,
                    missing,
                )));
            }
        }

        if change.timeline.is_deep_frozen() {
            return Resume::Halt;
        }

        let now = self.clock.now();
        let last = state.last();
        if now < last {
            // Backward travel: the next tick is a full period from now
            state.set_last(now);
            return Resume::After(self.full_wait());
        }

        let into_period = to_std(now - last);
        let left = period.saturating_sub(into_period);
        Resume::After(self.clock.timeline().scaled(left).max(MIN_WAIT))
    }
}

/// `n` whole periods as a signed duration
fn periods(period: Duration, n: u64) -> chrono::Duration {
    let nanos = period.as_nanos().saturating_mul(n as u128);
    chrono::Duration::nanoseconds(i64::try_from(nanos).unwrap_or(i64::MAX))
}

async fn emit_fast_forward(
    out: mpsc::Sender<Timestamp>,
    from: Timestamp,
    period: Duration,
    missing: u64,
) {
    for k in 1..=missing {
        if out.send(shift(from, periods(period, k))).await.is_err() {
            return;
        }
    }
}

async fn run_native(mut parts: TickerParts) {
    loop {
        let wait = parts.state.period();
        tokio::select! {
            _ = &mut parts.done => break,
            _ = parts.state.reset.notified() => continue,
            _ = tokio::time::sleep(wait) => {
                let at = Utc::now();
                parts.state.set_last(at);
                tokio::select! {
                    _ = &mut parts.done => break,
                    _ = parts.out.send(at) => {}
                }
            }
        }
    }
}
