use crate::notifier::Registry;
use parking_lot::RwLock;
use testcase_core::Timeline;

/// State guarded by the clock lock
pub(crate) struct State {
    pub timeline: Timeline,
    /// Registration is rare, so listeners share the timeline's lock
    pub listeners: Registry,
}

/// Single read/write lock over the alteration state
///
/// Mutations take the write side; every translation of wall time into
/// logical time reads a copy of the timeline through the read side.
/// Never hold either side across a channel send or an await.
pub(crate) struct ClockLock {
    state: RwLock<State>,
}

impl ClockLock {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                timeline: Timeline::new(),
                listeners: Registry::default(),
            }),
        }
    }

    /// Consistent snapshot of the timeline
    pub fn timeline(&self) -> Timeline {
        self.read(|state| state.timeline)
    }

    pub fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        f(&self.state.read())
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        f(&mut self.state.write())
    }
}
