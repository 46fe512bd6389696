//! Single-shot wait on logical time
//!
//! One worker task per call. The worker sleeps on the wall clock for the
//! scaled remainder of the wait and recomputes that remainder whenever the
//! clock is altered. While the clock is deep-frozen it only waits for the
//! next alteration.

use crate::controlled::ControlledClock;
use crate::notifier::{Change, Listener};
use log::trace;
use std::time::Duration;
use testcase_core::{Timeline, Timestamp};
use tokio::sync::oneshot;

pub(crate) fn spawn(clock: ControlledClock, d: Duration) -> oneshot::Receiver<Timestamp> {
    let (tx, rx) = oneshot::channel();
    let started_at = clock.now();

    if d.is_zero() {
        let _ = tx.send(started_at);
        return rx;
    }

    // Registered before returning so no alteration after the call is missed
    let listener = clock.subscribe();
    tokio::spawn(run(clock, listener, started_at, d, tx));
    rx
}

enum Step {
    Deliver,
    Rearm { deep: bool },
}

/// Decide what a change means for a wait that ends at `deadline`
fn on_change(change: &Change, deadline: Timestamp) -> Step {
    if change.when >= deadline {
        return Step::Deliver;
    }
    Step::Rearm {
        deep: change.timeline.is_deep_frozen(),
    }
}

async fn run(
    clock: ControlledClock,
    mut listener: Listener,
    started_at: Timestamp,
    d: Duration,
    mut tx: oneshot::Sender<Timestamp>,
) {
    let deadline = Timeline::deadline(started_at, d);
    let mut deep = clock.timeline().is_deep_frozen();

    loop {
        if deep {
            trace!("after({d:?}): deep-frozen, waiting for the next alteration");
            tokio::select! {
                change = listener.changed() => match on_change(&change, deadline) {
                    Step::Deliver => break,
                    Step::Rearm { deep: still } => {
                        deep = still;
                        continue;
                    }
                },
                _ = tx.closed() => return,
            }
        }

        let remaining = clock.timeline().remaining(started_at, d);
        trace!("after({d:?}): armed for {remaining:?} of wall time");

        tokio::select! {
            _ = tokio::time::sleep(remaining) => break,
            change = listener.changed() => match on_change(&change, deadline) {
                Step::Deliver => break,
                Step::Rearm { deep: still } => deep = still,
            },
            _ = tx.closed() => return,
        }
    }

    listener.deregister();
    let _ = tx.send(clock.now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Instant;
    use testcase_core::{TravelFlags, TravelOption};

    fn travel(clock: &ControlledClock, offset: chrono::Duration, options: &[TravelOption]) {
        let flags = TravelFlags::from_options(options);
        clock.alter(|tl, wall| tl.travel_at(wall, tl.now_at(wall) + offset, flags));
    }

    #[tokio::test]
    async fn test_zero_duration_fires_immediately() {
        let clock = ControlledClock::new();
        let before = clock.now();
        let fired = clock.after(Duration::ZERO).await.unwrap();
        assert!(fired >= before);
        assert_eq!(clock.subscribe().handle(), 0, "no listener should be left behind");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unbounded_wait_stays_pending() {
        let clock = ControlledClock::new();
        let mut forever = clock.after(Duration::MAX);
        let mut half = clock.after(Duration::from_secs(u64::MAX / 2));

        let slept = tokio::time::timeout(Duration::from_millis(100), clock.sleep(Duration::MAX)).await;
        assert!(slept.is_err(), "sleep(Duration::MAX) must block");

        travel(&clock, chrono::Duration::days(365 * 10_000), &[]);
        tokio::time::sleep(Duration::from_millis(20)).await;

        for rx in [&mut forever, &mut half] {
            assert!(
                matches!(rx.try_recv(), Err(oneshot::error::TryRecvError::Empty)),
                "the worker must keep waiting instead of dropping its sender"
            );
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_after_waits_for_duration() {
        let clock = ControlledClock::new();
        let start = Instant::now();
        let fired = clock.after(Duration::from_millis(50)).await.unwrap();

        assert!(start.elapsed() >= Duration::from_millis(45));
        assert!(fired <= Utc::now());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_speed_shortens_wait() {
        let clock = ControlledClock::new();
        clock.alter(|tl, wall| tl.with_speed_at(wall, 2.0));

        let start = Instant::now();
        clock.sleep(Duration::from_millis(100)).await;

        assert!(start.elapsed() <= Duration::from_millis(80));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_forward_travel_past_deadline_delivers() {
        let clock = ControlledClock::new();
        let rx = clock.after(Duration::from_secs(3600));

        travel(&clock, chrono::Duration::hours(2), &[]);

        let fired = tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("travel past the deadline should fire")
            .unwrap();
        assert!(fired - Utc::now() >= chrono::Duration::minutes(119));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_speed_change_rearms() {
        let clock = ControlledClock::new();
        let start = Instant::now();
        let rx = clock.after(Duration::from_millis(400));

        tokio::time::sleep(Duration::from_millis(20)).await;
        clock.alter(|tl, wall| tl.with_speed_at(wall, 10.0));

        tokio::time::timeout(Duration::from_millis(300), rx)
            .await
            .expect("10x speed should cut the wait short")
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(300));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deep_freeze_suspends_until_thaw() {
        let clock = ControlledClock::new();
        travel(&clock, chrono::Duration::zero(), &[TravelOption::DeepFreeze]);

        let mut rx = clock.after(Duration::from_millis(30));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err(), "deep freeze must hold the wait");

        travel(&clock, chrono::Duration::zero(), &[TravelOption::Unfreeze]);

        tokio::time::timeout(Duration::from_millis(500), rx)
            .await
            .expect("thaw should resume the wait")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deep_freeze_travel_past_deadline_delivers() {
        let clock = ControlledClock::new();
        travel(&clock, chrono::Duration::zero(), &[TravelOption::DeepFreeze]);

        let rx = clock.after(Duration::from_secs(10));
        travel(&clock, chrono::Duration::seconds(11), &[]);

        let fired = tokio::time::timeout(Duration::from_millis(500), rx)
            .await
            .expect("travel past the deadline fires even when deep-frozen")
            .unwrap();
        assert_eq!(fired, clock.now());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_receiver_releases_listener() {
        let clock = ControlledClock::new();
        let rx = clock.after(Duration::from_secs(3600));
        drop(rx);

        // The worker notices the closed receiver and deregisters
        let deadline = Instant::now() + Duration::from_secs(1);
        loop {
            let probe = clock.subscribe();
            if probe.handle() == 0 {
                break;
            }
            assert!(Instant::now() < deadline, "worker did not release its listener");
            drop(probe);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}
