use crate::travel::TravelFlags;
use crate::values::{Timestamp, scale_delta, shift, to_delta, to_std};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The alteration state of the clock
///
/// A timeline maps the wall clock onto logical time. While unaltered, the
/// two are identical. An alteration installs an anchor: the wall instant
/// `set_at` maps to the logical instant `when`, and logical time then moves
/// `speed` times as fast as the wall clock, or not at all while frozen.
///
/// ```text
///   logical = when + (wall - set_at) * speed     (running)
///   logical = when                               (frozen)
/// ```
///
/// Every method takes the wall instant explicitly; callers read the wall
/// clock once and pass it in, so a whole computation sees the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    altered: bool,
    set_at: Timestamp,
    when: Timestamp,
    prev: Timestamp,
    frozen: bool,
    deep: bool,
    speed: f64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            altered: false,
            set_at: DateTime::<Utc>::UNIX_EPOCH,
            when: DateTime::<Utc>::UNIX_EPOCH,
            prev: DateTime::<Utc>::UNIX_EPOCH,
            frozen: false,
            deep: false,
            speed: 1.0,
        }
    }
}

impl Timeline {
    /// An unaltered timeline (logical time equals wall time)
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a speed multiplier can be installed
    pub fn accepts_speed(speed: f64) -> bool {
        speed.is_finite() && speed > 0.0
    }

    pub fn is_altered(&self) -> bool {
        self.altered
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Frozen with derived timers and tickers suspended
    pub fn is_deep_frozen(&self) -> bool {
        self.frozen && self.deep
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Wall instant at which the current alteration was installed
    pub fn set_at(&self) -> Timestamp {
        self.set_at
    }

    /// Logical instant the anchor maps to
    pub fn when(&self) -> Timestamp {
        self.when
    }

    /// Logical instant that was current right before this alteration
    pub fn prev(&self) -> Timestamp {
        self.prev
    }

    /// Logical time at the given wall instant
    pub fn now_at(&self, wall: Timestamp) -> Timestamp {
        if !self.altered {
            return wall;
        }
        if self.frozen {
            return self.when;
        }
        shift(self.when, scale_delta(wall - self.set_at, self.speed))
    }

    /// Logical time at the current wall instant
    pub fn now(&self) -> Timestamp {
        self.now_at(Utc::now())
    }

    /// Translate a logical duration into the wall duration to wait for it
    pub fn scaled(&self, d: Duration) -> Duration {
        if !self.altered {
            return d;
        }
        let nanos = (d.as_nanos() as f64 / self.speed).round();
        if nanos >= u64::MAX as f64 {
            return Duration::MAX;
        }
        Duration::from_nanos(nanos as u64)
    }

    /// Wall time left until `d` of logical time has passed since `started_at`
    ///
    /// Zero once the logical now reaches `started_at + d`, and zero when the
    /// logical now is before `started_at` (time traveled back past the start).
    pub fn remaining_at(&self, wall: Timestamp, started_at: Timestamp, d: Duration) -> Duration {
        let now = self.now_at(wall);
        if now < started_at {
            return Duration::ZERO;
        }
        let delta = to_std(now - started_at);
        match d.checked_sub(delta) {
            Some(left) => self.scaled(left),
            None => Duration::ZERO,
        }
    }

    pub fn remaining(&self, started_at: Timestamp, d: Duration) -> Duration {
        self.remaining_at(Utc::now(), started_at, d)
    }

    /// Logical deadline of a wait of `d` started at `started_at`
    ///
    /// Clamps at the latest representable instant, so a wait of
    /// `Duration::MAX` has a deadline no travel can reach.
    pub fn deadline(started_at: Timestamp, d: Duration) -> Timestamp {
        shift(started_at, to_delta(d))
    }

    /// A new timeline running at `speed`, anchored at the current logical now
    ///
    /// Re-anchoring keeps logical time continuous: the instant right before
    /// and right after the change map to the same logical value. Freeze
    /// flags are preserved. `speed` must satisfy [`Timeline::accepts_speed`].
    pub fn with_speed_at(&self, wall: Timestamp, speed: f64) -> Timeline {
        debug_assert!(Self::accepts_speed(speed));
        let now = self.now_at(wall);
        Timeline {
            altered: true,
            set_at: wall,
            when: now,
            prev: now,
            frozen: self.frozen,
            deep: self.deep,
            speed,
        }
    }

    /// A new timeline whose logical now is `target` at the wall instant
    pub fn travel_at(&self, wall: Timestamp, target: Timestamp, flags: TravelFlags) -> Timeline {
        let mut next = Timeline {
            altered: true,
            set_at: wall,
            when: target,
            prev: self.now_at(wall),
            frozen: self.frozen,
            deep: self.deep,
            speed: self.speed,
        };
        if flags.freeze {
            next.frozen = true;
        }
        if flags.deep {
            next.deep = true;
        }
        if flags.unfreeze {
            next.frozen = false;
            next.deep = false;
        }
        next
    }
}
