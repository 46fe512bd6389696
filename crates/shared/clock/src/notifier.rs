//! Change notification fan-out
//!
//! Every control operation ends with one broadcast to every registered
//! listener. A listener owns a single-slot sink: a broadcast that finds the
//! slot occupied merges into it instead of queueing, so a slow listener
//! wakes once and still sees the whole span of time that was traveled.

use crate::lock::ClockLock;
use log::trace;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use testcase_core::{Timeline, Timestamp};
use tokio::sync::Notify;

/// One alteration of the clock, as seen by listeners
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Change {
    /// Logical now immediately before the mutation
    pub prev: Timestamp,
    /// Logical now immediately after the mutation
    pub when: Timestamp,
    /// Timeline installed by the mutation
    pub timeline: Timeline,
}

impl Change {
    /// Fold a later change into a pending one
    fn merge(self, later: Change) -> Change {
        Change {
            prev: self.prev,
            when: later.when,
            timeline: later.timeline,
        }
    }
}

/// Single-slot sink shared between the registry and one listener
#[derive(Default)]
pub(crate) struct Slot {
    pending: Mutex<Option<Change>>,
    notify: Notify,
}

impl Slot {
    fn offer(&self, change: Change) {
        {
            let mut pending = self.pending.lock();
            let next = match pending.take() {
                Some(prior) => prior.merge(change),
                None => change,
            };
            *pending = Some(next);
        }
        // Stores a permit when the listener is not parked yet
        self.notify.notify_one();
    }

    fn take(&self) -> Option<Change> {
        self.pending.lock().take()
    }
}

/// Listener registry keyed by the smallest unused handle
#[derive(Default)]
pub(crate) struct Registry {
    slots: BTreeMap<usize, Arc<Slot>>,
}

impl Registry {
    pub fn register(&mut self, slot: Arc<Slot>) -> usize {
        let mut handle = 0;
        for &taken in self.slots.keys() {
            if taken != handle {
                break;
            }
            handle += 1;
        }
        self.slots.insert(handle, slot);
        handle
    }

    pub fn deregister(&mut self, handle: usize) {
        self.slots.remove(&handle);
    }

    pub fn snapshot(&self) -> Vec<Arc<Slot>> {
        self.slots.values().cloned().collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}

/// Deliver a change to a snapshot of listeners
///
/// Must be called after the write lock is released.
pub(crate) fn broadcast(slots: &[Arc<Slot>], change: Change) {
    trace!("broadcasting clock change to {} listener(s)", slots.len());
    for slot in slots {
        slot.offer(change);
    }
}

/// A registered interest in clock changes
///
/// Dropping the listener deregisters it.
pub struct Listener {
    handle: usize,
    slot: Arc<Slot>,
    lock: Arc<ClockLock>,
    registered: AtomicBool,
}

impl Listener {
    pub(crate) fn register(lock: Arc<ClockLock>) -> Self {
        let slot = Arc::new(Slot::default());
        let handle = lock.write(|state| state.listeners.register(Arc::clone(&slot)));
        Self {
            handle,
            slot,
            lock,
            registered: AtomicBool::new(true),
        }
    }

    /// Registry handle of this listener
    pub fn handle(&self) -> usize {
        self.handle
    }

    /// Wait for the next change
    pub async fn changed(&mut self) -> Change {
        loop {
            if let Some(change) = self.slot.take() {
                return change;
            }
            self.slot.notify.notified().await;
        }
    }

    /// Take a pending change without waiting
    pub fn try_changed(&mut self) -> Option<Change> {
        self.slot.take()
    }

    /// Stop receiving changes; calling it again is a no-op
    pub fn deregister(&self) {
        if self.registered.swap(false, Ordering::SeqCst) {
            self.lock
                .write(|state| state.listeners.deregister(self.handle));
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.deregister();
    }
}
