//! Ready queue
//!
//! Runnable threads ordered by descending effective priority, first-in
//! first-out among equal priorities. Holds slot keys only; priorities are
//! read from the thread table.

use alloc::collections::VecDeque;
use core::cmp::Reverse;

use crate::scheduler::thread::{SlotId, ThreadTable};

pub struct ReadyQueue {
    queue: VecDeque<SlotId>,
}

impl ReadyQueue {
    pub const fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Insert behind every thread of equal or higher priority.
    pub fn push(&mut self, slot: SlotId, threads: &ThreadTable) {
        let priority = threads[slot].priority();
        let at = self
            .queue
            .iter()
            .position(|&s| threads[s].priority() < priority)
            .unwrap_or(self.queue.len());
        self.queue.insert(at, slot);
    }

    /// Get next thread to run
    pub fn pop(&mut self) -> Option<SlotId> {
        self.queue.pop_front()
    }

    pub fn front(&self) -> Option<SlotId> {
        self.queue.front().copied()
    }

    /// Priority of the thread that would run next.
    pub fn top_priority(&self, threads: &ThreadTable) -> Option<i32> {
        self.front().map(|s| threads[s].priority())
    }

    /// Restore ordering after priorities changed in place. The sort is
    /// stable, so equal priorities keep their queue order.
    pub fn resort(&mut self, threads: &ThreadTable) {
        self.queue
            .make_contiguous()
            .sort_by_key(|&s| Reverse(threads[s].priority()));
    }

    pub fn contains(&self, slot: SlotId) -> bool {
        self.queue.contains(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.queue.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Non-increasing priority from front to back.
    pub fn is_sorted(&self, threads: &ThreadTable) -> bool {
        self.queue
            .iter()
            .zip(self.queue.iter().skip(1))
            .all(|(&a, &b)| threads[a].priority() >= threads[b].priority())
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}
