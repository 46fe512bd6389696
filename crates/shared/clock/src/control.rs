//! Test control protocol
//!
//! Every alteration is made on behalf of a [`Scope`]: the scope must hold the
//! clock's sentinel, and the alteration is undone by one of its cleanups.
//! Cleanups run in reverse, so nested alterations unwind to the exact
//! timeline that was in place before the first one.

use crate::controlled::ControlledClock;
use crate::sentinel::{self, SENTINEL_KEY};
use log::debug;
use testcase_core::{Destination, Timeline, TravelFlags, TravelOption};
use testcase_ports::{ClockError, ClockResult, Scope};

impl ControlledClock {
    /// Move logical time to `to`, applying `options` in order
    ///
    /// `to` is either an offset from the current logical time or an absolute
    /// instant. Without options the current freeze state is kept.
    pub fn travel<S: Scope + ?Sized>(
        &self,
        scope: &S,
        to: impl Into<Destination>,
        options: &[TravelOption],
    ) -> ClockResult<()> {
        self.guard(scope)?;

        let destination = to.into();
        let flags = TravelFlags::from_options(options);
        let prior = self.try_alter(|tl, wall| {
            let target = destination.resolve(tl.now_at(wall))?;
            Some(tl.travel_at(wall, target, flags))
        });
        let Some(prior) = prior else {
            let err = ClockError::OutOfRange(format!("{destination:?}"));
            return Err(sentinel::report(scope, err));
        };

        let installed = self.timeline();
        debug!(
            "{}: travel {:?} -> {} (frozen={}, deep={})",
            scope.name(),
            destination,
            installed.when(),
            installed.is_frozen(),
            installed.is_deep_frozen()
        );
        self.undo_on_cleanup(scope, prior);
        Ok(())
    }

    /// Change how fast logical time flows relative to wall time
    ///
    /// Logical time is continuous across the change. A speed that is not
    /// finite and above zero is reported and leaves the clock untouched.
    pub fn set_speed<S: Scope + ?Sized>(&self, scope: &S, speed: f64) -> ClockResult<()> {
        self.guard(scope)?;
        if !Timeline::accepts_speed(speed) {
            return Err(sentinel::report(scope, ClockError::InvalidSpeed(speed)));
        }

        let prior = self.alter(|tl, wall| tl.with_speed_at(wall, speed));
        debug!("{}: speed {} -> {}", scope.name(), prior.speed(), speed);
        self.undo_on_cleanup(scope, prior);
        Ok(())
    }

    fn guard<S: Scope + ?Sized>(&self, scope: &S) -> ClockResult<()> {
        self.sentinel()
            .acquire(scope)
            .map_err(|err| sentinel::report(scope, err))
    }

    fn undo_on_cleanup<S: Scope + ?Sized>(&self, scope: &S, prior: Timeline) {
        let clock = self.clone();
        let name = scope.name();
        scope.cleanup(Box::new(move || {
            debug!("{name}: undo alteration ({SENTINEL_KEY} released after)");
            clock.restore(prior);
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::TestCase;
    use chrono::{TimeZone, Utc};
    use std::time::Duration;

    fn noon() -> testcase_core::Timestamp {
        Utc.with_ymd_and_hms(2022, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_travel_frozen_at_instant() {
        let clock = ControlledClock::new();
        let case = TestCase::new("frozen_noon");

        clock.travel(&case, noon(), &[TravelOption::Freeze]).unwrap();
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(clock.now(), noon());
        assert!(case.finish().is_empty());
        assert!(!clock.timeline().is_altered());
    }

    #[test]
    fn test_travel_by_offset() {
        let clock = ControlledClock::new();
        let case = TestCase::new("offset");

        clock
            .travel(&case, chrono::Duration::hours(1), &[TravelOption::Freeze])
            .unwrap();
        let ahead = clock.now() - Utc::now();
        assert!((ahead - chrono::Duration::hours(1)).num_milliseconds().abs() < 10);

        case.finish();
    }

    #[test]
    fn test_nested_alterations_unwind_exactly() {
        let clock = ControlledClock::new();
        let before = clock.timeline();
        let case = TestCase::new("nested");

        clock.travel(&case, noon(), &[TravelOption::DeepFreeze]).unwrap();
        clock.set_speed(&case, 4.0).unwrap();
        clock
            .travel(&case, Duration::from_secs(30), &[TravelOption::Unfreeze])
            .unwrap();
        assert_eq!(clock.timeline().speed(), 4.0);
        assert!(!clock.timeline().is_frozen());

        assert!(case.finish().is_empty());
        assert_eq!(clock.timeline(), before);
        assert_eq!(clock.sentinel().holder(), None);
    }

    #[test]
    fn test_invalid_speed_does_not_mutate() {
        let clock = ControlledClock::new();
        let case = TestCase::new("bad_speed");

        for speed in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            assert!(clock.set_speed(&case, speed).is_err());
        }

        assert!(!clock.timeline().is_altered());
        assert_eq!(case.finish().len(), 4);
    }

    #[test]
    fn test_concurrent_scope_is_failed() {
        let clock = ControlledClock::new();
        let a = TestCase::new("a");
        let b = TestCase::new("b");

        clock.travel(&a, noon(), &[TravelOption::Freeze]).unwrap();
        let altered = clock.timeline();

        let err = clock.set_speed(&b, 2.0).unwrap_err();
        assert!(matches!(err, ClockError::ClockInUse { .. }));
        assert_eq!(clock.timeline(), altered);
        assert_eq!(b.finish().len(), 1);

        assert!(a.finish().is_empty());
    }

    #[test]
    fn test_parallel_scope_is_failed() {
        let clock = ControlledClock::new();
        let case = TestCase::parallel("parallel");

        let err = clock.travel(&case, noon(), &[]).unwrap_err();
        assert!(matches!(err, ClockError::ParallelTest { .. }));
        assert!(!clock.timeline().is_altered());
        assert_eq!(case.finish().len(), 1);
    }

    #[test]
    fn test_travel_out_of_range_does_not_mutate() {
        let clock = ControlledClock::new();
        let mut listener = clock.subscribe();
        let case = TestCase::new("too_far");

        let err = clock
            .travel(&case, chrono::Duration::MAX, &[TravelOption::Freeze])
            .unwrap_err();
        assert!(matches!(err, ClockError::OutOfRange(_)));
        assert!(clock.travel(&case, Duration::MAX, &[]).is_err());

        assert!(!clock.timeline().is_altered());
        assert!(listener.try_changed().is_none(), "nothing was installed");
        assert_eq!(case.finish().len(), 2);
    }

    #[test]
    fn test_speed_change_keeps_freeze() {
        let clock = ControlledClock::new();
        let case = TestCase::new("frozen_speed");

        clock.travel(&case, noon(), &[TravelOption::Freeze]).unwrap();
        clock.set_speed(&case, 3.0).unwrap();

        assert!(clock.timeline().is_frozen());
        assert_eq!(clock.now(), noon());
        case.finish();
    }
}
