//! Control-block pool
//!
//! A fixed number of index-stable slots. Slot 0 holds the bootstrap thread,
//! which was not allocated from the pool; slots `1..=capacity` back `create`.
//! Control blocks are boxed so their address (and the context the arch switch
//! primitive writes into) stays put while the table is locked and unlocked.

use alloc::boxed::Box;
use alloc::vec::Vec;

use super::thread::Thread;
use super::tid::ThreadId;
use crate::scheduler::core::error::{SchedulerError, SchedulerResult};

/// Index of a control block in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(usize);

impl SlotId {
    /// The bootstrap thread's slot.
    pub const BOOTSTRAP: SlotId = SlotId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

pub struct ThreadTable {
    slots: Vec<Option<Box<Thread>>>,
    in_use: usize,
}

impl ThreadTable {
    /// A pool of `capacity` control blocks plus the bootstrap slot.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity + 1);
        slots.resize_with(capacity + 1, || None);
        Self { slots, in_use: 0 }
    }

    /// Pool capacity, excluding the bootstrap slot.
    pub fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// Pool slots currently allocated.
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    pub fn install_bootstrap(&mut self, thread: Thread) -> SlotId {
        crate::sched_assert!(self.slots[0].is_none(), "bootstrap thread installed twice");
        self.slots[0] = Some(Box::new(thread));
        SlotId::BOOTSTRAP
    }

    /// Reserve a free pool slot; the caller fills it with `fill`.
    pub fn reserve(&self) -> SchedulerResult<SlotId> {
        self.slots
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, slot)| slot.is_none())
            .map(|(index, _)| SlotId(index))
            .ok_or(SchedulerError::ThreadLimitReached {
                current: self.in_use,
                max: self.capacity(),
            })
    }

    pub fn fill(&mut self, slot: SlotId, thread: Thread) {
        crate::sched_assert!(
            slot != SlotId::BOOTSTRAP && self.slots[slot.0].is_none(),
            "slot {} is not free",
            slot.0
        );
        self.slots[slot.0] = Some(Box::new(thread));
        self.in_use += 1;
    }

    /// Release a pool slot, returning its control block for disposal.
    pub fn release(&mut self, slot: SlotId) -> Option<Box<Thread>> {
        if slot == SlotId::BOOTSTRAP {
            return None;
        }
        let thread = self.slots[slot.0].take();
        if thread.is_some() {
            self.in_use -= 1;
        }
        thread
    }

    pub fn get(&self, slot: SlotId) -> Option<&Thread> {
        self.slots.get(slot.0).and_then(|s| s.as_deref())
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Thread> {
        self.slots.get_mut(slot.0).and_then(|s| s.as_deref_mut())
    }

    /// Slot of the thread with `tid`, if it still has a control block.
    pub fn find(&self, tid: ThreadId) -> Option<SlotId> {
        self.slots
            .iter()
            .position(|s| s.as_ref().map_or(false, |t| t.id() == tid))
            .map(SlotId)
    }
}

impl core::ops::Index<SlotId> for ThreadTable {
    type Output = Thread;

    fn index(&self, slot: SlotId) -> &Thread {
        match self.get(slot) {
            Some(thread) => thread,
            None => panic!("[SCHED CRITICAL] Invariant violated: empty slot {}", slot.0),
        }
    }
}

impl core::ops::IndexMut<SlotId> for ThreadTable {
    fn index_mut(&mut self, slot: SlotId) -> &mut Thread {
        match self.get_mut(slot) {
            Some(thread) => thread,
            None => panic!("[SCHED CRITICAL] Invariant violated: empty slot {}", slot.0),
        }
    }
}
