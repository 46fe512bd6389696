use crate::dispatch::Dispatch;
use std::time::Duration;
use testcase_core::Timestamp;
use tokio::sync::oneshot::{self, error::TryRecvError};

/// Single-shot timer that can be stopped and re-armed
///
/// Each arming waits through the bound time source's `after`, so a timer on
/// the controlled clock honors speed, travel and deep freeze. Every arming
/// owns its receiver: stopping or re-arming discards a fire nobody read.
pub struct Timer {
    source: Dispatch,
    armed: Option<oneshot::Receiver<Timestamp>>,
}

impl Timer {
    pub(crate) fn new(source: Dispatch, d: Duration) -> Self {
        let armed = Some(source.after(d));
        Self { source, armed }
    }

    /// Wait for the timer to fire
    ///
    /// Never resolves for a stopped or already consumed timer.
    pub async fn recv(&mut self) -> Timestamp {
        if let Some(armed) = self.armed.as_mut() {
            let fired = armed.await;
            self.armed = None;
            if let Ok(at) = fired {
                return at;
            }
        }
        std::future::pending().await
    }

    pub fn try_recv(&mut self) -> Option<Timestamp> {
        let armed = self.armed.as_mut()?;
        match armed.try_recv() {
            Ok(at) => {
                self.armed = None;
                Some(at)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Closed) => {
                self.armed = None;
                None
            }
        }
    }

    /// Prevent the timer from firing
    ///
    /// Returns false if it already fired or was stopped. A fire that was
    /// delivered but not yet received is discarded.
    pub fn stop(&mut self) -> bool {
        match self.armed.take() {
            // Dropping the receiver lets the after worker exit
            Some(mut armed) => matches!(armed.try_recv(), Err(TryRecvError::Empty)),
            None => false,
        }
    }

    /// Re-arm the timer to fire after `d`
    ///
    /// Returns whether the timer was still active.
    pub fn reset(&mut self, d: Duration) -> bool {
        let active = self.stop();
        self.armed = Some(self.source.after(d));
        active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlled::ControlledClock;
    use testcase_core::TravelFlags;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timer_fires_once() {
        let clock = ControlledClock::new();
        let mut timer = clock.timer(Duration::from_millis(20));

        tokio::time::timeout(Duration::from_millis(500), timer.recv())
            .await
            .expect("timer should fire");
        assert!(!timer.stop(), "a fired timer is no longer active");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stopped_timer_stays_silent() {
        let clock = ControlledClock::new();
        let mut timer = clock.timer(Duration::from_millis(20));
        assert!(timer.stop());
        assert!(!timer.stop());

        let late = tokio::time::timeout(Duration::from_millis(80), timer.recv()).await;
        assert!(late.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reset_discards_unread_fire() {
        let clock = ControlledClock::new();
        let mut timer = clock.timer(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!timer.reset(Duration::from_secs(3600)), "it had already fired");
        let stale = tokio::time::timeout(Duration::from_millis(50), timer.recv()).await;
        assert!(stale.is_err(), "a re-armed timer must wait the new duration");
        assert!(timer.try_recv().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_try_recv_consumes_fire() {
        let clock = ControlledClock::new();
        let mut timer = clock.timer(Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(timer.try_recv().is_some());
        assert!(timer.try_recv().is_none());
        assert!(!timer.stop());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reset_rearms() {
        let clock = ControlledClock::new();
        let mut timer = clock.timer(Duration::from_secs(3600));
        assert!(timer.reset(Duration::from_millis(10)));

        tokio::time::timeout(Duration::from_millis(500), timer.recv())
            .await
            .expect("re-armed timer should fire");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_timer_follows_travel() {
        let clock = ControlledClock::new();
        let mut timer = clock.timer(Duration::from_secs(60));
        tokio::task::yield_now().await;

        clock.alter(|tl, wall| {
            tl.travel_at(wall, tl.now_at(wall) + chrono::Duration::minutes(2), TravelFlags::default())
        });

        tokio::time::timeout(Duration::from_millis(500), timer.recv())
            .await
            .expect("travel past the deadline fires the timer");
    }
}
