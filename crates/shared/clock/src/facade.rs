//! Process-wide time functions
//!
//! These are what application code calls instead of `Utc::now()` and
//! `tokio::time::sleep`. They dispatch to whichever backend the process
//! bound on first use; see [`crate::install`].

use crate::controlled::ControlledClock;
use crate::dispatch::{Dispatch, bound};
use crate::sentinel;
use crate::ticker::Ticker;
use crate::timer::Timer;
use std::time::Duration;
use testcase_core::{Destination, Timestamp, TravelOption};
use testcase_ports::{ClockError, ClockResult, Scope};
use tokio::sync::oneshot;

/// Current time
pub fn now() -> Timestamp {
    bound().now()
}

/// Time elapsed since `start`
pub fn since(start: Timestamp) -> chrono::Duration {
    now() - start
}

/// Wait for `d`
pub async fn sleep(d: Duration) {
    match bound() {
        Dispatch::Native(clock) => clock.sleep(d).await,
        Dispatch::Controlled(clock) => clock.sleep(d).await,
    }
}

/// Receiver yielding the current time once `d` has passed
pub fn after(d: Duration) -> oneshot::Receiver<Timestamp> {
    bound().after(d)
}

/// Periodic ticker
///
/// # Panics
/// Panics if `period` is zero.
pub fn ticker(period: Duration) -> Ticker {
    bound().ticker(period)
}

/// Single-shot timer
pub fn timer(d: Duration) -> Timer {
    bound().timer(d)
}

/// The process-wide controlled clock, if the façade is bound to it
pub fn controlled() -> Option<&'static ControlledClock> {
    match bound() {
        Dispatch::Controlled(clock) => Some(clock),
        Dispatch::Native(_) => None,
    }
}

/// Move the process-wide clock; undone when `scope` ends
pub fn travel<S: Scope + ?Sized>(
    scope: &S,
    to: impl Into<Destination>,
    options: &[TravelOption],
) -> ClockResult<()> {
    match controlled() {
        Some(clock) => clock.travel(scope, to, options),
        None => Err(sentinel::report(scope, ClockError::NativeBackend)),
    }
}

/// Change the process-wide clock's speed; undone when `scope` ends
pub fn set_speed<S: Scope + ?Sized>(scope: &S, speed: f64) -> ClockResult<()> {
    match controlled() {
        Some(clock) => clock.set_speed(scope, speed),
        None => Err(sentinel::report(scope, ClockError::NativeBackend)),
    }
}
