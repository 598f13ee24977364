//! Scheduler configuration
//!
//! Compile-time bounds shared by every policy, plus the boot-time
//! `SchedConfig` selected once by the kernel command line.

use static_assertions::const_assert;

/// Lowest thread priority (idle).
pub const PRI_MIN: i32 = 0;
/// Default priority of new and bootstrap threads.
pub const PRI_DEFAULT: i32 = 31;
/// Highest thread priority.
pub const PRI_MAX: i32 = 63;

/// Most favourable nice value.
pub const NICE_MIN: i32 = -20;
/// Default nice value.
pub const NICE_DEFAULT: i32 = 0;
/// Least favourable nice value.
pub const NICE_MAX: i32 = 20;

/// Fractional bits of the MLFQS fixed-point representation (17.14).
pub const FIXED_FRACTION_BITS: u32 = 14;

/// Bound on `|recent_cpu|`, in whole ticks.
pub const RECENT_CPU_MAX: i32 = 4096;

/// Timer ticks a thread may run before preemption is requested.
pub const TIME_SLICE: u32 = 4;

/// Timer interrupts per second.
pub const TIMER_FREQ: u64 = 100;

/// MLFQS priorities are recomputed every this many ticks.
pub const PRIORITY_RECOMPUTE_TICKS: u64 = 4;

/// Control blocks available to `create` (the bootstrap thread is extra).
pub const MAX_THREADS: usize = 64;

/// Kernel stack size for pool-allocated threads.
pub const DEFAULT_STACK_SIZE: usize = 4096;

/// Guard value stamped in every TCB and at the base of every stack.
pub const THREAD_MAGIC: u32 = 0xcd6a_bf4b;

/// Maximum stored length of a thread name, in bytes.
pub const THREAD_NAME_MAX: usize = 16;

const_assert!(PRI_MIN < PRI_DEFAULT && PRI_DEFAULT < PRI_MAX);
const_assert!(NICE_MIN < NICE_DEFAULT && NICE_DEFAULT < NICE_MAX);
const_assert!(FIXED_FRACTION_BITS < 31);
const_assert!(RECENT_CPU_MAX < (1 << (31 - FIXED_FRACTION_BITS)));
const_assert!(TIMER_FREQ % PRIORITY_RECOMPUTE_TICKS == 0);
const_assert!(DEFAULT_STACK_SIZE >= core::mem::size_of::<u32>() * 64);

/// Priority model, chosen at boot and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityPolicy {
    /// Caller-settable static priorities.
    #[default]
    Priority,
    /// Static priorities, plus one step of aging per tick for ready threads.
    Aging,
    /// Multi-level feedback queue: priorities derived from recent CPU and nice.
    Mlfqs,
}

impl PriorityPolicy {
    /// Parse a kernel command-line option (`-o mlfqs`, `-o aging`).
    pub fn from_option(option: &str) -> Option<Self> {
        match option {
            "mlfqs" => Some(Self::Mlfqs),
            "aging" => Some(Self::Aging),
            "priority" => Some(Self::Priority),
            _ => None,
        }
    }

    pub fn is_mlfqs(self) -> bool {
        self == Self::Mlfqs
    }

    pub fn is_aging(self) -> bool {
        self == Self::Aging
    }
}

/// Boot-time scheduler parameters.
#[derive(Debug, Clone, Copy)]
pub struct SchedConfig {
    pub policy: PriorityPolicy,
    /// Ticks per time slice
    pub time_slice: u32,
    /// Ticks per second, drives the MLFQS once-per-second updates
    pub timer_freq: u64,
    /// Capacity of the control-block pool
    pub max_threads: usize,
    pub stack_size: usize,
}

impl SchedConfig {
    pub const fn new(policy: PriorityPolicy) -> Self {
        Self {
            policy,
            time_slice: TIME_SLICE,
            timer_freq: TIMER_FREQ,
            max_threads: MAX_THREADS,
            stack_size: DEFAULT_STACK_SIZE,
        }
    }

    pub const fn with_max_threads(mut self, max_threads: usize) -> Self {
        self.max_threads = max_threads;
        self
    }

    pub const fn with_time_slice(mut self, ticks: u32) -> Self {
        self.time_slice = ticks;
        self
    }

    pub const fn with_stack_size(mut self, size: usize) -> Self {
        self.stack_size = size;
        self
    }
}

impl Default for SchedConfig {
    fn default() -> Self {
        Self::new(PriorityPolicy::default())
    }
}

/// Clamp a priority into `[PRI_MIN, PRI_MAX]`.
#[inline]
pub fn clamp_priority(priority: i32) -> i32 {
    priority.clamp(PRI_MIN, PRI_MAX)
}

/// Clamp a nice value into `[NICE_MIN, NICE_MAX]`.
#[inline]
pub fn clamp_nice(nice: i32) -> i32 {
    nice.clamp(NICE_MIN, NICE_MAX)
}
