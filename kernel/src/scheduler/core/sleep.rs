//! Sleep/alarm registry
//!
//! Blocked threads tagged with the tick at which they become runnable again.
//! Unordered: the timer scan visits every entry once per tick.

use alloc::vec::Vec;

use crate::scheduler::thread::SlotId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Sleeper {
    slot: SlotId,
    wake_tick: u64,
}

pub struct SleepRegistry {
    sleepers: Vec<Sleeper>,
}

impl SleepRegistry {
    pub const fn new() -> Self {
        Self {
            sleepers: Vec::new(),
        }
    }

    pub fn insert(&mut self, slot: SlotId, wake_tick: u64) {
        crate::sched_assert!(!self.contains(slot), "slot {} is already asleep", slot.index());
        self.sleepers.push(Sleeper { slot, wake_tick });
    }

    /// Remove every entry due at `now`, handing each to `wake` in scan order.
    pub fn drain_expired(&mut self, now: u64, mut wake: impl FnMut(SlotId)) -> usize {
        let mut woken = 0;
        self.sleepers.retain(|s| {
            if s.wake_tick <= now {
                wake(s.slot);
                woken += 1;
                false
            } else {
                true
            }
        });
        woken
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.sleepers.iter().any(|s| s.slot == slot)
    }

    pub fn len(&self) -> usize {
        self.sleepers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sleepers.is_empty()
    }
}

impl Default for SleepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
