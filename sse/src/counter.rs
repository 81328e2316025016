use events::{EventCategory, Notification, UNKNOWN_INDEX};
use std::sync::atomic::{AtomicU64, Ordering};

/// One slot per known category plus the catch-all slot.
pub const SLOT_COUNT: usize = EventCategory::COUNT + 1;

/// Per-category change counters shared between the watcher and every session.
///
/// Single writer, many readers: only the relay's watcher task increments
/// (`increment` is crate-private), everything else reads. Each slot is an
/// independent atomic, so no lock is needed, but a reader may see one slot
/// updated and another not yet.
#[derive(Debug)]
pub struct CounterTable {
    slots: [AtomicU64; SLOT_COUNT],
}

impl CounterTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| AtomicU64::new(0)),
        }
    }

    /// Adds one to the slot for `notification` and returns the new value.
    /// Unrecognized tags land in the catch-all slot.
    pub(crate) fn increment<N: Into<Notification>>(&self, notification: N) -> u64 {
        let index = notification.into().index();
        self.slots[index].fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn get(&self, category: EventCategory) -> u64 {
        self.slots[category.index()].load(Ordering::Acquire)
    }

    /// Copies every slot. Slots are read one at a time; the copy as a whole
    /// is not a transaction.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(std::array::from_fn(|i| {
            self.slots[i].load(Ordering::Acquire)
        }))
    }
}

impl Default for CounterTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of a `CounterTable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot([u64; SLOT_COUNT]);

impl Snapshot {
    pub fn get(&self, category: EventCategory) -> u64 {
        self.0[category.index()]
    }

    pub fn unknown(&self) -> u64 {
        self.0[UNKNOWN_INDEX]
    }

    pub(crate) fn set(&mut self, category: EventCategory, value: u64) {
        self.0[category.index()] = value;
    }

    pub fn as_array(&self) -> &[u64; SLOT_COUNT] {
        &self.0
    }
}

impl PartialEq<[u64; SLOT_COUNT]> for Snapshot {
    fn eq(&self, other: &[u64; SLOT_COUNT]) -> bool {
        &self.0 == other
    }
}
