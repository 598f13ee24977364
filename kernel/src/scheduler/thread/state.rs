//! State - Thread state machine
//!
//! Manages thread lifecycle and state transitions

use core::fmt;

/// Thread state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ThreadState {
    /// Thread is currently running
    Running = 0,

    /// Thread is in the ready queue
    Ready = 1,

    /// Thread is waiting (lock, semaphore, alarm)
    Blocked = 2,

    /// Thread has exited; its control block is reclaimed by the next thread
    Dying = 3,
}

impl ThreadState {
    /// Validate a lifecycle transition
    pub fn can_transition_to(self, to: ThreadState) -> bool {
        use ThreadState::*;

        match (self, to) {
            // Preemption or yield
            (Running, Ready) => true,

            // block() / sleep
            (Running, Blocked) => true,

            // exit()
            (Running, Dying) => true,

            // Dispatch
            (Ready, Running) => true,

            // unblock()
            (Blocked, Ready) => true,

            // The idle thread is dispatched without passing through the queue
            (Blocked, Running) => true,

            // Nothing leaves Dying
            _ => false,
        }
    }
}

impl fmt::Display for ThreadState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Running => write!(f, "Running"),
            Self::Ready => write!(f, "Ready"),
            Self::Blocked => write!(f, "Blocked"),
            Self::Dying => write!(f, "Dying"),
        }
    }
}
