//! Stack - Kernel thread stack allocation
//!
//! Every pool-allocated thread owns one stack. The lowest word holds
//! `THREAD_MAGIC`; a thread that runs off the bottom of its stack overwrites
//! it, which the scheduler detects the next time it validates the thread.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::scheduler::config::THREAD_MAGIC;
use crate::scheduler::core::error::{SchedulerError, SchedulerResult};

const CANARY: [u8; 4] = THREAD_MAGIC.to_ne_bytes();

/// Thread stack
pub struct Stack {
    memory: Box<[u8]>,
}

impl Stack {
    /// Allocate a zeroed stack of `size` bytes with the canary in place.
    pub fn new(size: usize) -> SchedulerResult<Self> {
        let mut buffer: Vec<u8> = Vec::new();
        buffer
            .try_reserve_exact(size)
            .map_err(|_| SchedulerError::StackAllocationFailed { size })?;
        buffer.resize(size, 0);

        let mut memory = buffer.into_boxed_slice();
        if let Some(base) = memory.get_mut(..CANARY.len()) {
            base.copy_from_slice(&CANARY);
        }

        Ok(Self { memory })
    }

    /// Get stack base address (lowest)
    pub fn base(&self) -> usize {
        self.memory.as_ptr() as usize
    }

    /// Get stack top address (initial stack pointer)
    pub fn top(&self) -> usize {
        self.base() + self.memory.len()
    }

    /// Get stack size
    pub fn size(&self) -> usize {
        self.memory.len()
    }

    /// The canary at the base has not been overwritten.
    pub fn is_intact(&self) -> bool {
        self.memory.get(..CANARY.len()) == Some(&CANARY[..])
    }

    #[cfg(test)]
    pub(crate) fn smash_for_test(&mut self) {
        self.memory[0] ^= 0xff;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stack_is_intact() {
        let stack = Stack::new(4096).unwrap();
        assert_eq!(stack.size(), 4096);
        assert!(stack.is_intact());
        assert_eq!(stack.top() - stack.base(), 4096);
    }

    #[test]
    fn test_overflow_is_detected() {
        let mut stack = Stack::new(256).unwrap();
        stack.smash_for_test();
        assert!(!stack.is_intact());
    }

    #[test]
    fn test_huge_stack_reports_failure() {
        let err = Stack::new(usize::MAX).err();
        assert_eq!(err, Some(SchedulerError::StackAllocationFailed { size: usize::MAX }));
    }
}
