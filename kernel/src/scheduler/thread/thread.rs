//! Thread Structure and Management
//!
//! Represents a schedulable thread. Control blocks live in the scheduler's
//! `ThreadTable`; queues refer to them by slot, never by pointer.

use alloc::boxed::Box;
use core::any::Any;

use super::stack::Stack;
use super::state::ThreadState;
use super::tid::ThreadId;
use crate::scheduler::config::{
    clamp_nice, PRI_DEFAULT, PRI_MAX, PRI_MIN, THREAD_MAGIC, THREAD_NAME_MAX,
};
use crate::scheduler::mlfqs::Fp;

/// Kernel thread body. Receives the `arg` given to `create`.
pub type ThreadFn = fn(usize);

/// Opaque process-layer state (fd table, parent/child links, exit relay).
pub type ProcessData = Box<dyn Any + Send>;

/// Saved thread context (windowed: stack pointer and resume address)
///
/// The layout belongs to the `Arch` implementation; the scheduler only
/// hands out pointers to it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadContext {
    /// Stack pointer
    pub sp: usize,
    /// Resume address
    pub ip: usize,
}

impl ThreadContext {
    pub const fn empty() -> Self {
        Self { sp: 0, ip: 0 }
    }
}

/// Thread Control Block (TCB)
pub struct Thread {
    /// Unique thread ID
    id: ThreadId,

    /// Thread name (for debugging)
    name: Box<str>,

    /// Current state
    state: ThreadState,

    /// Priority set at creation or by `set_priority`
    base_priority: i32,

    /// Priority used for scheduling (aged or MLFQS-derived)
    priority: i32,

    nice: i32,
    recent_cpu: Fp,

    /// Wake-up deadline while parked in the sleep registry
    wake_tick: Option<u64>,

    /// Saved context (for the arch switch primitive)
    context: ThreadContext,

    /// Kernel stack; the bootstrap thread runs on the boot stack instead
    stack: Option<Stack>,

    entry: Option<ThreadFn>,
    arg: usize,

    exit_status: i32,

    /// Reserved for the process layer; never interpreted here
    process: Option<ProcessData>,

    /// Runtime statistics
    ticks: u64,
    dispatches: u64,

    magic: u32,
}

impl Thread {
    /// Create a new kernel thread control block, initially Blocked.
    pub fn new_kernel(
        id: ThreadId,
        name: &str,
        priority: i32,
        entry: ThreadFn,
        arg: usize,
        stack: Stack,
    ) -> Self {
        crate::sched_assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "priority {} outside [{}, {}]",
            priority,
            PRI_MIN,
            PRI_MAX
        );

        Self {
            id,
            name: truncate_name(name).into(),
            state: ThreadState::Blocked,
            base_priority: priority,
            priority,
            nice: 0,
            recent_cpu: Fp::ZERO,
            wake_tick: None,
            context: ThreadContext::empty(),
            stack: Some(stack),
            entry: Some(entry),
            arg,
            exit_status: 0,
            process: None,
            ticks: 0,
            dispatches: 0,
            magic: THREAD_MAGIC,
        }
    }

    /// Adopt the code running at boot as the "main" thread.
    pub fn bootstrap(id: ThreadId) -> Self {
        Self {
            id,
            name: "main".into(),
            state: ThreadState::Running,
            base_priority: PRI_DEFAULT,
            priority: PRI_DEFAULT,
            nice: 0,
            recent_cpu: Fp::ZERO,
            wake_tick: None,
            context: ThreadContext::empty(),
            stack: None,
            entry: None,
            arg: 0,
            exit_status: 0,
            process: None,
            ticks: 0,
            dispatches: 1,
            magic: THREAD_MAGIC,
        }
    }

    /// Get thread ID
    pub fn id(&self) -> ThreadId {
        self.id
    }

    /// Get thread name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get thread state
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Move to `state`; illegal lifecycle transitions are kernel faults.
    pub fn set_state(&mut self, state: ThreadState) {
        crate::sched_assert!(
            self.state.can_transition_to(state),
            "thread {} ({}) cannot go from {} to {}",
            self.id,
            self.name,
            self.state,
            state
        );
        self.state = state;
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn base_priority(&self) -> i32 {
        self.base_priority
    }

    /// Set both the base and the effective priority.
    pub fn set_priority(&mut self, priority: i32) {
        crate::sched_assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "priority {} outside [{}, {}]",
            priority,
            PRI_MIN,
            PRI_MAX
        );
        self.base_priority = priority;
        self.priority = priority;
    }

    /// Set only the effective priority (aging, MLFQS recompute).
    pub fn set_effective_priority(&mut self, priority: i32) {
        debug_assert!((PRI_MIN..=PRI_MAX).contains(&priority));
        self.priority = priority;
    }

    /// One aging step, saturating at `PRI_MAX`.
    pub fn age(&mut self) {
        if self.priority < PRI_MAX {
            self.priority += 1;
        }
    }

    pub fn nice(&self) -> i32 {
        self.nice
    }

    pub fn set_nice(&mut self, nice: i32) {
        self.nice = clamp_nice(nice);
    }

    pub fn recent_cpu(&self) -> Fp {
        self.recent_cpu
    }

    pub fn set_recent_cpu(&mut self, recent_cpu: Fp) {
        self.recent_cpu = recent_cpu;
    }

    /// Inherit nice and recent CPU from the creating thread.
    pub fn inherit_from(&mut self, parent: &Thread) {
        self.nice = parent.nice;
        self.recent_cpu = parent.recent_cpu;
    }

    pub fn wake_tick(&self) -> Option<u64> {
        self.wake_tick
    }

    pub fn set_wake_tick(&mut self, tick: Option<u64>) {
        self.wake_tick = tick;
    }

    /// Get context pointer (for context switch)
    pub fn context_ptr(&mut self) -> *mut ThreadContext {
        &mut self.context as *mut ThreadContext
    }

    pub fn context_mut(&mut self) -> &mut ThreadContext {
        &mut self.context
    }

    pub fn stack(&self) -> Option<&Stack> {
        self.stack.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn stack_mut(&mut self) -> Option<&mut Stack> {
        self.stack.as_mut()
    }

    /// Entry point and argument, taken once by the kernel-thread trampoline.
    pub fn take_entry(&mut self) -> Option<(ThreadFn, usize)> {
        self.entry.take().map(|f| (f, self.arg))
    }

    /// Get exit status
    pub fn exit_status(&self) -> i32 {
        self.exit_status
    }

    /// Set exit status
    pub fn set_exit_status(&mut self, code: i32) {
        self.exit_status = code;
    }

    pub fn process(&self) -> Option<&(dyn Any + Send + 'static)> {
        self.process.as_deref()
    }

    pub fn process_mut(&mut self) -> Option<&mut (dyn Any + Send + 'static)> {
        self.process.as_deref_mut()
    }

    pub fn set_process(&mut self, data: ProcessData) -> Option<ProcessData> {
        self.process.replace(data)
    }

    pub fn take_process(&mut self) -> Option<ProcessData> {
        self.process.take()
    }

    /// Threads carrying process state count as user time.
    pub fn is_user(&self) -> bool {
        self.process.is_some()
    }

    /// Record one timer tick spent running
    pub fn inc_ticks(&mut self) {
        self.ticks += 1;
    }

    /// Record a dispatch
    pub fn inc_dispatches(&mut self) {
        self.dispatches += 1;
    }

    /// Magic intact and stack canary untouched.
    pub fn is_valid(&self) -> bool {
        self.magic == THREAD_MAGIC && self.stack.as_ref().map_or(true, Stack::is_intact)
    }

    /// Get statistics
    pub fn stats(&self) -> ThreadStats {
        ThreadStats {
            id: self.id,
            name: self.name.clone(),
            state: self.state,
            priority: self.priority,
            base_priority: self.base_priority,
            nice: self.nice,
            recent_cpu: self.recent_cpu.to_hundredths(),
            ticks: self.ticks,
            dispatches: self.dispatches,
        }
    }
}

/// Thread statistics snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadStats {
    pub id: ThreadId,
    pub name: Box<str>,
    pub state: ThreadState,
    pub priority: i32,
    pub base_priority: i32,
    pub nice: i32,
    /// recent_cpu × 100
    pub recent_cpu: i32,
    pub ticks: u64,
    pub dispatches: u64,
}

fn truncate_name(name: &str) -> &str {
    if name.len() <= THREAD_NAME_MAX {
        return name;
    }
    let mut end = THREAD_NAME_MAX;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}
