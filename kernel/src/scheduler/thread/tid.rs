//! Thread id allocation
//!
//! Ids are issued from a strictly increasing counter. The counter may be
//! touched with interrupts enabled, so it carries its own mutex, held only
//! for the increment.

use spin::Mutex;

/// Thread ID type
pub type ThreadId = u64;

/// Monotonic thread id source.
pub struct TidAllocator {
    next: Mutex<ThreadId>,
}

impl TidAllocator {
    /// Ids start at 1; the bootstrap thread takes the first one.
    pub const fn new() -> Self {
        Self {
            next: Mutex::new(1),
        }
    }

    /// Allocate a new thread ID
    pub fn allocate(&self) -> ThreadId {
        let mut next = self.next.lock();
        let tid = *next;
        *next += 1;
        tid
    }
}

impl Default for TidAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::vec::Vec;

    #[test]
    fn test_ids_are_sequential() {
        let tids = TidAllocator::new();
        assert_eq!(tids.allocate(), 1);
        assert_eq!(tids.allocate(), 2);
        assert_eq!(tids.allocate(), 3);
    }

    #[test]
    fn test_ids_unique_under_contention() {
        let tids = Arc::new(TidAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let tids = Arc::clone(&tids);
                std::thread::spawn(move || (0..250).map(|_| tids.allocate()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<ThreadId> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 1000);
        assert_eq!(all.first(), Some(&1));
        assert_eq!(all.last(), Some(&1000));
    }
}
