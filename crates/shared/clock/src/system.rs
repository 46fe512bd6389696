use crate::config::DEFAULT_TICKER_CAPACITY;
use crate::dispatch::Dispatch;
use crate::ticker::Ticker;
use crate::timer::Timer;
use chrono::Utc;
use std::time::Duration;
use testcase_core::Timestamp;
use testcase_ports::Clock;
use tokio::sync::oneshot;

/// Real system clock for production use
///
/// This simply delegates to the wall clock and tokio's timers.
/// The façade binds to it outside of test binaries.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    ticker_capacity: usize,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::with_ticker_capacity(DEFAULT_TICKER_CAPACITY)
    }

    pub fn with_ticker_capacity(ticker_capacity: usize) -> Self {
        Self { ticker_capacity }
    }

    pub fn now(&self) -> Timestamp {
        Utc::now()
    }

    pub fn since(&self, start: Timestamp) -> chrono::Duration {
        self.now() - start
    }

    pub fn after(&self, d: Duration) -> oneshot::Receiver<Timestamp> {
        let (mut tx, rx) = oneshot::channel();
        if d.is_zero() {
            let _ = tx.send(Utc::now());
            return rx;
        }
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(d) => {
                    let _ = tx.send(Utc::now());
                }
                _ = tx.closed() => {}
            }
        });
        rx
    }

    pub async fn sleep(&self, d: Duration) {
        tokio::time::sleep(d).await;
    }

    /// # Panics
    /// Panics if `period` is zero.
    pub fn ticker(&self, period: Duration) -> Ticker {
        Ticker::native(period, self.ticker_capacity)
    }

    pub fn timer(&self, d: Duration) -> Timer {
        Timer::new(Dispatch::Native(*self), d)
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}
