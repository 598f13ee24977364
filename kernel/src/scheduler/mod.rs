//! Scheduler subsystem
//!
//! Preemptive priority scheduler with optional aging or MLFQS, timer-driven
//! preemption and tick-based sleeping. One process-wide instance, installed
//! by `init` and never torn down; the free functions below operate on it.

pub mod config;
pub mod core;
pub mod idle;
pub mod mlfqs;
pub mod thread;

use alloc::boxed::Box;
use ::core::any::Any;
use spin::Once;

use crate::arch::Arch;

// Re-exports
pub use self::config::{PriorityPolicy, SchedConfig};
pub use self::core::{PendingCleanup, Scheduler, SchedulerError, SchedulerResult, SchedulerStats};
pub use thread::{ProcessData, Thread, ThreadContext, ThreadFn, ThreadId, ThreadState, ThreadStats};

static SCHEDULER: Once<Scheduler> = Once::new();

/// Initialize the scheduler, adopting the running code as thread "main".
///
/// Interrupts must be disabled. Later calls return the existing instance.
pub fn init(arch: &'static dyn Arch, config: SchedConfig) -> &'static Scheduler {
    SCHEDULER.call_once(|| Scheduler::new(arch, config))
}

pub fn try_scheduler() -> SchedulerResult<&'static Scheduler> {
    SCHEDULER.get().ok_or(SchedulerError::NotInitialized)
}

/// The global scheduler; using it before `init` is a kernel fault.
pub fn scheduler() -> &'static Scheduler {
    match try_scheduler() {
        Ok(sched) => sched,
        Err(err) => panic!("[SCHED CRITICAL] {} ({})", err, err.recovery_hint()),
    }
}

/// First code run by every kernel thread.
pub extern "C" fn kernel_thread_entry() -> ! {
    scheduler().enter_thread()
}

/// Create the idle thread and enable preemption
pub fn start() -> SchedulerResult<()> {
    scheduler().start()
}

pub fn create(name: &str, priority: i32, entry: ThreadFn, arg: usize) -> SchedulerResult<ThreadId> {
    scheduler().create(name, priority, entry, arg)
}

pub fn current() -> ThreadStats {
    scheduler().current()
}

pub fn tid() -> ThreadId {
    scheduler().tid()
}

pub fn name() -> Box<str> {
    scheduler().name()
}

pub fn exit(status: i32) -> ! {
    scheduler().exit(status)
}

/// Yield CPU to scheduler
pub fn yield_now() {
    scheduler().yield_now();
}

/// Block current thread (interrupts must be off)
pub fn block() {
    scheduler().block();
}

/// Unblock a thread (wake up interface)
pub fn unblock(tid: ThreadId) {
    scheduler().unblock(tid);
}

/// Timer interrupt handler body
pub fn tick(now: u64) {
    scheduler().tick(now);
}

/// Interrupt epilogue
pub fn interrupt_return() {
    scheduler().interrupt_return();
}

pub fn sleep_until(wake_tick: u64) {
    scheduler().sleep_until(wake_tick);
}

pub fn sleep_for(ticks: i64) {
    scheduler().sleep_for(ticks);
}

pub fn set_priority(priority: i32) {
    scheduler().set_priority(priority);
}

pub fn get_priority() -> i32 {
    scheduler().get_priority()
}

pub fn set_nice(nice: i32) {
    scheduler().set_nice(nice);
}

pub fn get_nice() -> i32 {
    scheduler().get_nice()
}

pub fn get_load_avg() -> i32 {
    scheduler().get_load_avg()
}

pub fn get_recent_cpu() -> i32 {
    scheduler().get_recent_cpu()
}

pub fn set_process_data(data: ProcessData) -> Option<ProcessData> {
    scheduler().set_process_data(data)
}

pub fn with_process_data<R>(f: impl FnOnce(Option<&mut (dyn Any + Send + 'static)>) -> R) -> R {
    scheduler().with_process_data(f)
}

pub fn take_process_data() -> Option<ProcessData> {
    scheduler().take_process_data()
}

pub fn for_each_thread(f: impl FnMut(&Thread)) {
    scheduler().for_each_thread(f);
}

/// Convenient function to get scheduler statistics
pub fn stats() -> SchedulerStats {
    scheduler().stats()
}

pub fn print_stats() {
    scheduler().print_stats();
}
