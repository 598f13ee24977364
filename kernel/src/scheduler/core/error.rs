//! Scheduler Error Handling
//!
//! Resource exhaustion is reported through `SchedulerError`. Contract
//! violations (unblocking a thread that is not blocked, scheduling with
//! interrupts enabled, out-of-range priorities) are kernel faults and go
//! through `sched_assert!` instead.

use core::fmt;

/// Scheduler error types with detailed context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    /// Control-block pool exhausted
    ThreadLimitReached { current: usize, max: usize },

    /// Stack allocation failed
    StackAllocationFailed { size: usize },

    /// Scheduler used before `init`
    NotInitialized,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ThreadLimitReached { current, max } => {
                write!(f, "Thread limit reached: {}/{}", current, max)
            }
            Self::StackAllocationFailed { size } => {
                write!(f, "OOM: cannot allocate {} byte stack", size)
            }
            Self::NotInitialized => write!(f, "Scheduler not initialized"),
        }
    }
}

impl SchedulerError {
    /// Get recovery hint for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            Self::ThreadLimitReached { .. } => "Wait for threads to exit or increase limit",
            Self::StackAllocationFailed { .. } => "Free memory or reduce stack sizes",
            Self::NotInitialized => "Call scheduler::init() during boot",
        }
    }

    /// Get error severity (0-3)
    pub fn severity(&self) -> u8 {
        match self {
            Self::NotInitialized => 3,
            Self::StackAllocationFailed { .. } => 2,
            Self::ThreadLimitReached { .. } => 2,
        }
    }
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Macro to log scheduler errors with context
#[macro_export]
macro_rules! sched_error {
    ($err:expr) => {{
        let err = $err;
        log::error!("[SCHED] Error: {} (hint: {})", err, err.recovery_hint());
        err
    }};
}

/// Macro for critical scheduler assertions
#[macro_export]
macro_rules! sched_assert {
    ($cond:expr, $($reason:tt)+) => {
        if !$cond {
            panic!("[SCHED CRITICAL] Invariant violated: {}", format_args!($($reason)+));
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_limits() {
        let err = SchedulerError::ThreadLimitReached { current: 64, max: 64 };
        assert_eq!(format!("{}", err), "Thread limit reached: 64/64");
        assert_eq!(err.severity(), 2);
    }

    #[test]
    #[should_panic(expected = "Invariant violated: tid 7")]
    fn test_sched_assert_panics_with_reason() {
        let tid = 7;
        sched_assert!(tid == 0, "tid {} is not the idle thread", tid);
    }
}
