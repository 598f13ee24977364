//! All-threads registry
//!
//! Every thread from creation until it exits, in creation order. Used for
//! enumeration (priority recompute, statistics), never for picking what runs.

use alloc::vec::Vec;

use crate::scheduler::thread::SlotId;

pub struct ThreadRegistry {
    members: Vec<SlotId>,
}

impl ThreadRegistry {
    pub const fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    pub fn register(&mut self, slot: SlotId) {
        crate::sched_assert!(!self.contains(slot), "slot {} registered twice", slot.index());
        self.members.push(slot);
    }

    pub fn unregister(&mut self, slot: SlotId) -> bool {
        match self.members.iter().position(|&s| s == slot) {
            Some(at) => {
                self.members.remove(at);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.members.contains(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.members.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Default for ThreadRegistry {
    fn default() -> Self {
        Self::new()
    }
}
