//! Statistics - Scheduler accounting
//!
//! Tick accounting by thread kind plus switch/spawn counters. Counters are
//! atomics so they can be read without entering a critical section.

use core::sync::atomic::{AtomicU64, Ordering};

/// Scheduler counters
pub struct SchedulerCounters {
    /// Ticks spent in the idle thread
    pub idle_ticks: AtomicU64,

    /// Ticks spent in kernel threads
    pub kernel_ticks: AtomicU64,

    /// Ticks spent in threads carrying process state
    pub user_ticks: AtomicU64,

    /// Total context switches
    pub total_switches: AtomicU64,

    /// Total threads created
    pub total_spawns: AtomicU64,

    /// Control blocks reclaimed after exit
    pub total_reclaimed: AtomicU64,

    /// Preemptions (involuntary switches at interrupt return)
    pub preemptions: AtomicU64,

    /// Voluntary yields
    pub yields: AtomicU64,
}

impl SchedulerCounters {
    pub const fn new() -> Self {
        Self {
            idle_ticks: AtomicU64::new(0),
            kernel_ticks: AtomicU64::new(0),
            user_ticks: AtomicU64::new(0),
            total_switches: AtomicU64::new(0),
            total_spawns: AtomicU64::new(0),
            total_reclaimed: AtomicU64::new(0),
            preemptions: AtomicU64::new(0),
            yields: AtomicU64::new(0),
        }
    }

    /// Charge one tick to the running thread's category
    pub fn record_tick(&self, idle: bool, user: bool) {
        let counter = if idle {
            &self.idle_ticks
        } else if user {
            &self.user_ticks
        } else {
            &self.kernel_ticks
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record context switch
    pub fn record_switch(&self) {
        self.total_switches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_spawn(&self) {
        self.total_spawns.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reclaim(&self) {
        self.total_reclaimed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record preemption
    pub fn record_preemption(&self) {
        self.preemptions.fetch_add(1, Ordering::Relaxed);
    }

    /// Record voluntary yield
    pub fn record_yield(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
    }

    /// Total ticks observed
    pub fn total_ticks(&self) -> u64 {
        self.idle_ticks.load(Ordering::Relaxed)
            + self.kernel_ticks.load(Ordering::Relaxed)
            + self.user_ticks.load(Ordering::Relaxed)
    }

    /// Get CPU utilization (percentage of non-idle ticks)
    pub fn cpu_utilization(&self) -> u8 {
        let total = self.total_ticks();
        if total > 0 {
            let busy = total - self.idle_ticks.load(Ordering::Relaxed);
            ((busy * 100) / total) as u8
        } else {
            0
        }
    }
}

impl Default for SchedulerCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler statistics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStats {
    pub idle_ticks: u64,
    pub kernel_ticks: u64,
    pub user_ticks: u64,
    pub total_switches: u64,
    pub total_spawns: u64,
    pub total_reclaimed: u64,
    pub preemptions: u64,
    pub yields: u64,
    pub total_threads: usize,
    pub ready_queue_len: usize,
    pub sleeping: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_categories() {
        let c = SchedulerCounters::new();
        c.record_tick(true, false);
        c.record_tick(false, false);
        c.record_tick(false, true);
        c.record_tick(false, true);
        assert_eq!(c.idle_ticks.load(Ordering::Relaxed), 1);
        assert_eq!(c.kernel_ticks.load(Ordering::Relaxed), 1);
        assert_eq!(c.user_ticks.load(Ordering::Relaxed), 2);
        assert_eq!(c.cpu_utilization(), 75);
    }

    #[test]
    fn test_utilization_without_ticks() {
        assert_eq!(SchedulerCounters::new().cpu_utilization(), 0);
    }
}
