//! Scheduler - Core scheduling logic
//!
//! Single-core preemptive priority scheduler:
//! - Pick-next takes the head of the ready queue, or the idle thread
//! - Two-phase switch: `switch_to` hands the CPU over, `finish_switch` runs
//!   first thing on the new thread and reclaims a dying predecessor
//! - `tick` does time-slice, sleep and priority bookkeeping, and requests
//!   preemption which `interrupt_return` honors
//!
//! All state sits behind one spin mutex, taken only with interrupts disabled
//! and always released before the arch switch primitive runs.

use alloc::boxed::Box;
use core::any::Any;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

use crate::arch::{Arch, InterruptGuard};
use crate::scheduler::config::{PriorityPolicy, SchedConfig, PRI_MIN};
use crate::scheduler::core::error::SchedulerResult;
use crate::scheduler::core::policy::{PriorityEngine, RunQueues};
use crate::scheduler::core::ready_queue::ReadyQueue;
use crate::scheduler::core::registry::ThreadRegistry;
use crate::scheduler::core::sleep::SleepRegistry;
use crate::scheduler::core::statistics::{SchedulerCounters, SchedulerStats};
use crate::scheduler::idle;
use crate::scheduler::thread::{
    ProcessData, SlotId, Stack, Thread, ThreadContext, ThreadFn, ThreadId, ThreadState, ThreadStats,
    ThreadTable, TidAllocator,
};

/// Everything guarded by the scheduler lock.
struct SchedState {
    threads: ThreadTable,
    ready: ReadyQueue,
    sleepers: SleepRegistry,
    registry: ThreadRegistry,
    engine: PriorityEngine,

    /// Thread owning the CPU
    current: SlotId,
    idle: Option<SlotId>,

    /// Thread switched away from, waiting for the successor's `finish_switch`
    handoff: Option<SlotId>,

    /// Ticks since the current thread was dispatched
    slice_ticks: u32,

    /// Preemption requested for the end of the current interrupt
    yield_on_return: bool,

    /// Last tick seen
    now: u64,
}

/// Handoff record produced by `switch_to`.
///
/// Must be consumed by `finish_switch` on the thread that now owns the CPU.
#[must_use = "a dying predecessor is only reclaimed by finish_switch"]
pub struct PendingCleanup {
    prev: Option<SlotId>,
}

/// Scheduler
pub struct Scheduler {
    arch: &'static dyn Arch,
    config: SchedConfig,
    tids: TidAllocator,
    state: Mutex<SchedState>,
    counters: SchedulerCounters,

    /// Set while `tick` runs
    in_interrupt: AtomicBool,
}

impl Scheduler {
    /// Adopt the running boot code as thread "main".
    ///
    /// Interrupts must still be disabled.
    pub fn new(arch: &'static dyn Arch, config: SchedConfig) -> Self {
        crate::sched_assert!(!arch.interrupts_enabled(), "scheduler initialised with interrupts enabled");

        let tids = TidAllocator::new();
        let mut threads = ThreadTable::new(config.max_threads);
        let boot = threads.install_bootstrap(Thread::bootstrap(tids.allocate()));
        let mut registry = ThreadRegistry::new();
        registry.register(boot);

        log::info!(
            "[SCHED] Initialized: policy={:?}, slice={} ticks, {} thread slots",
            config.policy,
            config.time_slice,
            config.max_threads
        );

        Self {
            arch,
            config,
            tids,
            state: Mutex::new(SchedState {
                threads,
                ready: ReadyQueue::new(),
                sleepers: SleepRegistry::new(),
                registry,
                engine: PriorityEngine::new(config.policy, config.timer_freq),
                current: boot,
                idle: None,
                handoff: None,
                slice_ticks: 0,
                yield_on_return: false,
                now: 0,
            }),
            counters: SchedulerCounters::new(),
            in_interrupt: AtomicBool::new(false),
        }
    }

    /// Create the idle thread and enable interrupts.
    pub fn start(&self) -> SchedulerResult<()> {
        let stack = Stack::new(self.config.stack_size).map_err(|e| crate::sched_error!(e))?;
        let idle_tid = {
            let _guard = InterruptGuard::new(self.arch);
            let mut state = self.state.lock();
            let st = &mut *state;
            crate::sched_assert!(st.idle.is_none(), "scheduler started twice");

            let slot = self.spawn_locked(st, "idle", PRI_MIN, idle::idle_thread_entry, 0, stack)?;
            st.threads[slot].set_priority(PRI_MIN);
            st.idle = Some(slot);
            st.threads[slot].id()
        };

        log::info!("[SCHED] Idle thread {} ready, enabling interrupts", idle_tid);
        self.arch.enable_interrupts();
        Ok(())
    }

    pub fn arch(&self) -> &'static dyn Arch {
        self.arch
    }

    pub fn config(&self) -> &SchedConfig {
        &self.config
    }

    pub fn policy(&self) -> PriorityPolicy {
        self.config.policy
    }

    /// Inside the timer handler.
    pub fn in_interrupt(&self) -> bool {
        self.in_interrupt.load(Ordering::SeqCst)
    }

    /// Last tick passed to `tick`.
    pub fn now(&self) -> u64 {
        let _guard = InterruptGuard::new(self.arch);
        self.state.lock().now
    }

    /// Create a kernel thread and make it ready.
    ///
    /// If it outranks the caller, the caller yields before this returns.
    pub fn create(&self, name: &str, priority: i32, entry: ThreadFn, arg: usize) -> SchedulerResult<ThreadId> {
        let stack = Stack::new(self.config.stack_size).map_err(|e| crate::sched_error!(e))?;

        let (tid, outranks_caller) = {
            let _guard = InterruptGuard::new(self.arch);
            let mut state = self.state.lock();
            let st = &mut *state;

            let slot = self.spawn_locked(st, name, priority, entry, arg, stack)?;
            Self::make_ready(st, slot);
            let outranks = st.threads[slot].priority() > st.threads[st.current].priority();
            (st.threads[slot].id(), outranks)
        };

        log::debug!("[SCHED] Spawned thread {} '{}' (priority {})", tid, name, priority);

        if outranks_caller && !self.in_interrupt() {
            self.yield_now();
        }
        Ok(tid)
    }

    /// Allocate, initialize and register a control block, left Blocked.
    fn spawn_locked(
        &self,
        st: &mut SchedState,
        name: &str,
        priority: i32,
        entry: ThreadFn,
        arg: usize,
        stack: Stack,
    ) -> SchedulerResult<SlotId> {
        let slot = st.threads.reserve().map_err(|e| crate::sched_error!(e))?;

        let mut thread = Thread::new_kernel(self.tids.allocate(), name, priority, entry, arg, stack);
        thread.inherit_from(&st.threads[st.current]);
        thread.set_priority(st.engine.initial_priority(priority, &thread));

        let stack_top = thread.stack().map_or(0, Stack::top);
        // SAFETY: the stack was allocated for this thread and nothing runs on it yet.
        unsafe {
            self.arch
                .init_context(thread.context_mut(), stack_top, crate::scheduler::kernel_thread_entry);
        }

        st.threads.fill(slot, thread);
        st.registry.register(slot);
        self.counters.record_spawn();
        Ok(slot)
    }

    /// Run `f` on the running thread's control block.
    ///
    /// Validates the control block first. `f` runs with the scheduler locked
    /// and must not call back into it.
    pub fn with_current<R>(&self, f: impl FnOnce(&mut Thread) -> R) -> R {
        let _guard = InterruptGuard::new(self.arch);
        let mut state = self.state.lock();
        let cur = state.current;
        let thread = &mut state.threads[cur];

        crate::sched_assert!(
            thread.is_valid(),
            "thread {} ({}) is corrupted: magic or stack canary overwritten",
            thread.id(),
            thread.name()
        );
        crate::sched_assert!(
            thread.state() == ThreadState::Running,
            "current thread {} is {}",
            thread.id(),
            thread.state()
        );
        f(thread)
    }

    /// Snapshot of the running thread.
    pub fn current(&self) -> ThreadStats {
        self.with_current(|t| t.stats())
    }

    pub fn tid(&self) -> ThreadId {
        self.with_current(|t| t.id())
    }

    pub fn name(&self) -> Box<str> {
        self.with_current(|t| t.name().into())
    }

    /// Deschedule the current thread for good. Its control block is freed
    /// by whichever thread runs next.
    pub fn exit(&self, status: i32) -> ! {
        self.begin_exit(status);
        panic!("[SCHED CRITICAL] Invariant violated: exited thread was resumed");
    }

    /// Everything `exit` does, including the switch. Returns only on
    /// machines whose switch primitive returns (the host model).
    pub fn begin_exit(&self, status: i32) {
        crate::sched_assert!(!self.in_interrupt(), "exit from interrupt context");

        let _guard = InterruptGuard::new(self.arch);
        {
            let mut state = self.state.lock();
            let st = &mut *state;
            let cur = st.current;
            st.registry.unregister(cur);

            let thread = &mut st.threads[cur];
            thread.set_exit_status(status);
            thread.set_state(ThreadState::Dying);
            log::debug!("[SCHED] Thread {} '{}' exiting with {}", thread.id(), thread.name(), status);
        }
        self.schedule();
    }

    /// Give up the CPU; the caller stays runnable.
    pub fn yield_now(&self) {
        crate::sched_assert!(!self.in_interrupt(), "yield from interrupt context");
        self.counters.record_yield();
        self.yield_current();
    }

    fn yield_current(&self) {
        let _guard = InterruptGuard::new(self.arch);
        {
            let mut state = self.state.lock();
            let st = &mut *state;
            let cur = st.current;
            if st.idle == Some(cur) {
                st.threads[cur].set_state(ThreadState::Blocked);
            } else {
                st.threads[cur].set_state(ThreadState::Ready);
                st.ready.push(cur, &st.threads);
            }
        }
        self.schedule();
    }

    /// Put the current thread to sleep until `unblock`.
    ///
    /// Interrupts must already be disabled.
    pub fn block(&self) {
        crate::sched_assert!(!self.in_interrupt(), "block from interrupt context");
        crate::sched_assert!(!self.arch.interrupts_enabled(), "block with interrupts enabled");
        {
            let mut state = self.state.lock();
            let cur = state.current;
            state.threads[cur].set_state(ThreadState::Blocked);
        }
        self.schedule();
    }

    /// Move a blocked thread to the ready queue. Never switches.
    pub fn unblock(&self, tid: ThreadId) {
        let _guard = InterruptGuard::new(self.arch);
        let mut state = self.state.lock();
        let st = &mut *state;
        let Some(slot) = st.threads.find(tid) else {
            panic!("[SCHED CRITICAL] Invariant violated: unblock of unknown thread {}", tid);
        };
        Self::make_ready(st, slot);
        log::trace!("[SCHED] Unblocked thread {}", tid);
    }

    fn make_ready(st: &mut SchedState, slot: SlotId) {
        crate::sched_assert!(st.idle != Some(slot), "idle thread cannot be queued");
        let thread = &mut st.threads[slot];
        crate::sched_assert!(
            thread.wake_tick().is_none(),
            "thread {} is sleeping until tick {:?}",
            thread.id(),
            thread.wake_tick()
        );
        thread.set_state(ThreadState::Ready);
        st.ready.push(slot, &st.threads);
    }

    /// Pick the next thread and switch to it. The caller has already moved
    /// the current thread out of Running.
    fn schedule(&self) {
        crate::sched_assert!(!self.arch.interrupts_enabled(), "schedule with interrupts enabled");

        let (cur, next) = {
            let mut state = self.state.lock();
            let st = &mut *state;
            let cur = st.current;
            crate::sched_assert!(
                st.threads[cur].state() != ThreadState::Running,
                "thread {} is still running",
                st.threads[cur].id()
            );
            (cur, Self::next_thread_to_run(st))
        };

        let token = if next != cur {
            self.switch_to(next)
        } else {
            PendingCleanup { prev: Some(cur) }
        };
        self.finish_switch(token);
    }

    fn next_thread_to_run(st: &mut SchedState) -> SlotId {
        match st.ready.pop().or(st.idle) {
            Some(slot) => slot,
            None => panic!("[SCHED CRITICAL] Invariant violated: nothing to run and no idle thread"),
        }
    }

    /// Hand the CPU to `next`. Returns on the thread that is current once
    /// this thread is resumed, with the handoff recorded by that switch.
    pub(crate) fn switch_to(&self, next: SlotId) -> PendingCleanup {
        let (prev_ctx, next_ctx) = {
            let mut state = self.state.lock();
            let st = &mut *state;
            crate::sched_assert!(
                st.threads[next].is_valid(),
                "thread {} ({}) is corrupted: magic or stack canary overwritten",
                st.threads[next].id(),
                st.threads[next].name()
            );

            let prev = st.current;
            st.handoff = Some(prev);
            st.current = next;
            let next_ctx = st.threads[next].context_ptr() as *const ThreadContext;
            (st.threads[prev].context_ptr(), next_ctx)
        };

        self.counters.record_switch();
        // SAFETY: control blocks are boxed and a dying one is released only by
        // `finish_switch`, after this switch completed.
        unsafe { self.arch.switch_threads(prev_ctx, next_ctx) };

        self.take_pending()
    }

    fn take_pending(&self) -> PendingCleanup {
        PendingCleanup {
            prev: self.state.lock().handoff.take(),
        }
    }

    /// First action of a thread after gaining the CPU.
    pub(crate) fn finish_switch(&self, token: PendingCleanup) {
        let Some(prev) = token.prev else {
            return;
        };

        let reclaimed = {
            let mut state = self.state.lock();
            let st = &mut *state;
            let cur = st.current;

            let thread = &mut st.threads[cur];
            thread.set_state(ThreadState::Running);
            thread.inc_dispatches();
            st.slice_ticks = 0;

            if prev != cur && st.threads[prev].state() == ThreadState::Dying {
                st.threads.release(prev)
            } else {
                None
            }
        };

        if let Some(dead) = reclaimed {
            self.counters.record_reclaim();
            log::debug!("[SCHED] Reclaimed thread {} (status {})", dead.id(), dead.exit_status());
        }
    }

    /// Body of the kernel-thread trampoline up to the thread function's
    /// return: completes the switch, enables interrupts, runs `entry(arg)`.
    pub fn run_entry(&self) {
        let token = self.take_pending();
        self.finish_switch(token);

        let entry = {
            let mut state = self.state.lock();
            let cur = state.current;
            state.threads[cur].take_entry()
        };
        self.arch.enable_interrupts();

        if let Some((function, arg)) = entry {
            function(arg);
        }
    }

    /// Trampoline: run the thread function, then exit with status 0.
    pub fn enter_thread(&self) -> ! {
        self.run_entry();
        self.exit(0)
    }

    /// Timer interrupt: accounting, wake-ups and priority bookkeeping.
    pub fn tick(&self, now: u64) {
        self.in_interrupt.store(true, Ordering::SeqCst);
        {
            let _guard = InterruptGuard::new(self.arch);
            let mut state = self.state.lock();
            let st = &mut *state;
            st.now = now;

            let cur = st.current;
            let idle = st.idle;
            let thread = &mut st.threads[cur];
            self.counters.record_tick(idle == Some(cur), thread.is_user());
            thread.inc_ticks();

            st.slice_ticks += 1;
            if st.slice_ticks >= self.config.time_slice {
                st.yield_on_return = true;
            }

            let SchedState { threads, ready, sleepers, .. } = &mut *st;
            let woken = sleepers.drain_expired(now, |slot| {
                let thread = &mut threads[slot];
                thread.set_wake_tick(None);
                thread.set_state(ThreadState::Ready);
                ready.push(slot, threads);
            });
            if woken > 0 {
                log::trace!("[SCHED] Tick {}: woke {} sleeper(s)", now, woken);
            }

            st.engine.on_tick(
                now,
                RunQueues {
                    threads: &mut st.threads,
                    ready: &mut st.ready,
                    registry: &st.registry,
                    current: cur,
                    idle,
                },
            );

            if Self::should_preempt(st) {
                st.yield_on_return = true;
            }
        }
        self.in_interrupt.store(false, Ordering::SeqCst);
    }

    fn should_preempt(st: &SchedState) -> bool {
        match st.ready.top_priority(&st.threads) {
            Some(top) => st.idle == Some(st.current) || top > st.threads[st.current].priority(),
            None => false,
        }
    }

    /// Interrupt epilogue: honor a preemption request made by `tick`.
    pub fn interrupt_return(&self) {
        crate::sched_assert!(!self.in_interrupt(), "interrupt_return inside the handler");
        let requested = {
            let _guard = InterruptGuard::new(self.arch);
            core::mem::take(&mut self.state.lock().yield_on_return)
        };
        if requested {
            self.counters.record_preemption();
            self.yield_current();
        }
    }

    /// Block until tick `wake_tick`.
    pub fn sleep_until(&self, wake_tick: u64) {
        crate::sched_assert!(!self.in_interrupt(), "sleep from interrupt context");

        let _guard = InterruptGuard::new(self.arch);
        {
            let mut state = self.state.lock();
            let st = &mut *state;
            let cur = st.current;
            crate::sched_assert!(st.idle != Some(cur), "idle thread cannot sleep");

            let thread = &mut st.threads[cur];
            thread.set_wake_tick(Some(wake_tick));
            thread.set_state(ThreadState::Blocked);
            log::trace!("[SCHED] Thread {} sleeping until tick {}", thread.id(), wake_tick);
            st.sleepers.insert(cur, wake_tick);
        }
        self.schedule();
    }

    /// Sleep for `ticks` timer ticks from the last tick seen.
    pub fn sleep_for(&self, ticks: i64) {
        if ticks <= 0 {
            return;
        }
        let deadline = self.now().saturating_add(ticks as u64);
        self.sleep_until(deadline);
    }

    /// Set the current thread's priority; ignored under MLFQS.
    ///
    /// Yields if a ready thread now outranks the caller.
    pub fn set_priority(&self, priority: i32) {
        if self.config.policy.is_mlfqs() {
            return;
        }
        let outranked = {
            let _guard = InterruptGuard::new(self.arch);
            let mut state = self.state.lock();
            let st = &mut *state;
            let cur = st.current;
            st.threads[cur].set_priority(priority);
            st.ready.top_priority(&st.threads).map_or(false, |top| top > priority)
        };
        if outranked {
            self.yield_now();
        }
    }

    pub fn get_priority(&self) -> i32 {
        self.with_current(|t| t.priority())
    }

    /// Set the current thread's nice value (clamped). Under MLFQS its
    /// priority is recomputed and the caller yields if outranked.
    pub fn set_nice(&self, nice: i32) {
        let outranked = {
            let _guard = InterruptGuard::new(self.arch);
            let mut state = self.state.lock();
            let st = &mut *state;
            let cur = st.current;
            let thread = &mut st.threads[cur];
            thread.set_nice(nice);
            st.engine.refresh(thread);
            let priority = thread.priority();
            st.ready.top_priority(&st.threads).map_or(false, |top| top > priority)
        };
        if outranked && self.config.policy.is_mlfqs() {
            self.yield_now();
        }
    }

    pub fn get_nice(&self) -> i32 {
        self.with_current(|t| t.nice())
    }

    /// System load average, times 100.
    pub fn get_load_avg(&self) -> i32 {
        let _guard = InterruptGuard::new(self.arch);
        self.state.lock().engine.load_avg().to_hundredths()
    }

    /// Current thread's recent CPU, times 100.
    pub fn get_recent_cpu(&self) -> i32 {
        self.with_current(|t| t.recent_cpu().to_hundredths())
    }

    /// Attach process-layer state to the current thread.
    pub fn set_process_data(&self, data: ProcessData) -> Option<ProcessData> {
        self.with_current(|t| t.set_process(data))
    }

    pub fn with_process_data<R>(&self, f: impl FnOnce(Option<&mut (dyn Any + Send + 'static)>) -> R) -> R {
        self.with_current(|t| f(t.process_mut()))
    }

    pub fn take_process_data(&self) -> Option<ProcessData> {
        self.with_current(|t| t.take_process())
    }

    /// Visit every live thread in creation order, with interrupts off.
    pub fn for_each_thread(&self, mut f: impl FnMut(&Thread)) {
        let _guard = InterruptGuard::new(self.arch);
        let state = self.state.lock();
        for slot in state.registry.iter() {
            f(&state.threads[slot]);
        }
    }

    /// Get scheduler statistics
    pub fn stats(&self) -> SchedulerStats {
        let (total_threads, ready_queue_len, sleeping) = {
            let _guard = InterruptGuard::new(self.arch);
            let state = self.state.lock();
            (state.registry.len(), state.ready.len(), state.sleepers.len())
        };
        let c = &self.counters;
        SchedulerStats {
            idle_ticks: c.idle_ticks.load(Ordering::Relaxed),
            kernel_ticks: c.kernel_ticks.load(Ordering::Relaxed),
            user_ticks: c.user_ticks.load(Ordering::Relaxed),
            total_switches: c.total_switches.load(Ordering::Relaxed),
            total_spawns: c.total_spawns.load(Ordering::Relaxed),
            total_reclaimed: c.total_reclaimed.load(Ordering::Relaxed),
            preemptions: c.preemptions.load(Ordering::Relaxed),
            yields: c.yields.load(Ordering::Relaxed),
            total_threads,
            ready_queue_len,
            sleeping,
        }
    }

    /// Print scheduler statistics
    pub fn print_stats(&self) {
        let stats = self.stats();
        log::info!("=== Scheduler Statistics ===");
        log::info!(
            "Thread: {} idle ticks, {} kernel ticks, {} user ticks",
            stats.idle_ticks,
            stats.kernel_ticks,
            stats.user_ticks
        );
        log::info!("Total threads:  {}", stats.total_threads);
        log::info!("Total spawns:   {}", stats.total_spawns);
        log::info!("Total switches: {} ({} preemptions, {} yields)", stats.total_switches, stats.preemptions, stats.yields);
        log::info!("Queue lengths:  Ready={}, Sleeping={}", stats.ready_queue_len, stats.sleeping);
        log::info!("CPU utilization: {}%", self.counters.cpu_utilization());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::SimArch;
    use crate::scheduler::config::{PRI_DEFAULT, PRI_MAX, RECENT_CPU_MAX};
    use crate::scheduler::mlfqs::Fp;
    use crate::scheduler::core::error::SchedulerError;
    use core::sync::atomic::AtomicUsize;
    use std::vec::Vec;

    fn body(_: usize) {}

    fn boot(config: SchedConfig) -> (Scheduler, &'static SimArch) {
        let arch: &'static SimArch = Box::leak(Box::new(SimArch::new()));
        let sched = Scheduler::new(arch, config.with_max_threads(8).with_stack_size(1024));
        sched.start().unwrap();
        (sched, arch)
    }

    fn boot_policy(policy: PriorityPolicy) -> (Scheduler, &'static SimArch) {
        boot(SchedConfig::new(policy))
    }

    impl Scheduler {
        fn ready_tids(&self) -> Vec<ThreadId> {
            let state = self.state.lock();
            state.ready.iter().map(|s| state.threads[s].id()).collect()
        }

        fn state_of(&self, tid: ThreadId) -> Option<ThreadState> {
            let state = self.state.lock();
            state.threads.find(tid).map(|s| state.threads[s].state())
        }

        fn thread_stats(&self, tid: ThreadId) -> Option<ThreadStats> {
            let state = self.state.lock();
            state.threads.find(tid).map(|s| state.threads[s].stats())
        }

        fn registered_tids(&self) -> Vec<ThreadId> {
            let mut tids = Vec::new();
            self.for_each_thread(|t| tids.push(t.id()));
            tids
        }

        fn yield_requested(&self) -> bool {
            self.state.lock().yield_on_return
        }

        /// One Running thread, not queued; queue sorted and all Ready.
        fn check_invariants(&self) {
            let state = self.state.lock();
            let running = state.registry.iter().filter(|&s| state.threads[s].state() == ThreadState::Running);
            assert!(running.count() <= 1);
            assert_eq!(state.threads[state.current].state(), ThreadState::Running);
            assert!(!state.ready.contains(state.current));
            assert!(state.ready.is_sorted(&state.threads));
            assert!(state.ready.iter().all(|s| state.threads[s].state() == ThreadState::Ready));
            assert!(state.idle.map_or(true, |idle| !state.ready.contains(idle)));
        }
    }

    #[test]
    fn test_bootstrap_thread_is_main() {
        let (sched, arch) = boot_policy(PriorityPolicy::Priority);
        let main = sched.current();
        assert_eq!(main.id, 1);
        assert_eq!(&*main.name, "main");
        assert_eq!(main.priority, PRI_DEFAULT);
        assert_eq!(main.state, ThreadState::Running);
        assert!(arch.interrupts_enabled());
        // main and idle
        assert_eq!(sched.registered_tids(), [1, 2]);
        sched.check_invariants();
    }

    #[test]
    fn test_ready_queue_orders_new_threads() {
        let (sched, arch) = boot_policy(PriorityPolicy::Priority);
        let low = sched.create("low", 10, body, 0).unwrap();
        let high = sched.create("high", 20, body, 0).unwrap();
        let mid = sched.create("mid", 15, body, 0).unwrap();

        assert_eq!(sched.ready_tids(), [high, mid, low]);
        assert_eq!(sched.tid(), 1);
        assert_eq!(arch.switch_count(), 0);
        sched.check_invariants();
    }

    #[test]
    fn test_higher_priority_child_runs_first() {
        static RAN: AtomicUsize = AtomicUsize::new(0);
        fn child(arg: usize) {
            RAN.store(arg, Ordering::SeqCst);
        }

        let (sched, arch) = boot_policy(PriorityPolicy::Priority);
        sched.set_priority(5);
        let b = sched.create("b", 10, child, 42).unwrap();

        assert_eq!(sched.tid(), b);
        assert_eq!(sched.state_of(1), Some(ThreadState::Ready));
        assert_eq!(arch.switch_count(), 1);
        sched.check_invariants();

        sched.run_entry();
        assert_eq!(RAN.load(Ordering::SeqCst), 42);
        assert!(arch.interrupts_enabled());
    }

    #[test]
    fn test_exiting_thread_leaves_registry_and_is_reclaimed() {
        let (sched, arch) = boot_policy(PriorityPolicy::Priority);
        let t = sched.create("short", 40, body, 0).unwrap();
        assert_eq!(sched.tid(), t);
        assert!(sched.registered_tids().contains(&t));

        sched.begin_exit(7);

        assert_eq!(sched.tid(), 1);
        assert!(!sched.registered_tids().contains(&t));
        assert_eq!(sched.state_of(t), None);
        assert_eq!(sched.stats().total_reclaimed, 1);
        assert_eq!(arch.switch_count(), 2);
        sched.check_invariants();
    }

    #[test]
    fn test_sleep_wakes_on_deadline() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        sched.tick(100);
        sched.sleep_for(50);

        // Nothing else is ready, so the idle thread took over.
        assert_eq!(sched.tid(), 2);
        assert_eq!(sched.stats().sleeping, 1);

        sched.tick(149);
        assert_eq!(sched.state_of(1), Some(ThreadState::Blocked));
        sched.tick(150);
        assert_eq!(sched.state_of(1), Some(ThreadState::Ready));
        assert!(sched.yield_requested());

        sched.interrupt_return();
        assert_eq!(sched.tid(), 1);
        assert_eq!(sched.state_of(2), Some(ThreadState::Blocked));
        assert_eq!(sched.stats().preemptions, 1);
        sched.check_invariants();
    }

    #[test]
    fn test_non_positive_sleep_returns_immediately() {
        let (sched, arch) = boot_policy(PriorityPolicy::Priority);
        sched.sleep_for(0);
        sched.sleep_for(-5);
        assert_eq!(sched.tid(), 1);
        assert_eq!(arch.switch_count(), 0);
    }

    #[test]
    fn test_block_and_unblock() {
        let (sched, arch) = boot_policy(PriorityPolicy::Priority);
        let worker = sched.create("worker", 10, body, 0).unwrap();

        arch.disable_interrupts();
        sched.block();
        assert_eq!(sched.tid(), worker);
        assert_eq!(sched.state_of(1), Some(ThreadState::Blocked));

        // Unblocking a higher-priority thread never switches by itself.
        sched.unblock(1);
        assert_eq!(sched.tid(), worker);
        assert_eq!(sched.ready_tids(), [1]);
        sched.check_invariants();
    }

    #[test]
    #[should_panic(expected = "cannot go from Ready to Ready")]
    fn test_unblock_ready_thread_aborts() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        let t = sched.create("t", 10, body, 0).unwrap();
        sched.unblock(t);
    }

    #[test]
    #[should_panic(expected = "is sleeping until tick")]
    fn test_unblock_sleeping_thread_aborts() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        sched.sleep_until(10);
        sched.unblock(1);
    }

    #[test]
    #[should_panic(expected = "block with interrupts enabled")]
    fn test_block_requires_interrupts_off() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        sched.block();
    }

    #[test]
    fn test_time_slice_round_robin() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        let peer = sched.create("peer", PRI_DEFAULT, body, 0).unwrap();

        for now in 1..4 {
            sched.tick(now);
            assert!(!sched.yield_requested());
        }
        sched.tick(4);
        assert!(sched.yield_requested());

        sched.interrupt_return();
        assert_eq!(sched.tid(), peer);
        assert_eq!(sched.ready_tids(), [1]);
        assert_eq!(sched.stats().kernel_ticks, 4);
        sched.check_invariants();
    }

    #[test]
    fn test_interrupt_return_without_request_keeps_thread() {
        let (sched, arch) = boot_policy(PriorityPolicy::Priority);
        sched.create("peer", PRI_DEFAULT, body, 0).unwrap();
        sched.tick(1);
        sched.interrupt_return();
        assert_eq!(sched.tid(), 1);
        assert_eq!(arch.switch_count(), 0);
    }

    #[test]
    fn test_aging_lets_starved_thread_run() {
        let (sched, _) = boot(SchedConfig::new(PriorityPolicy::Aging).with_time_slice(1000));
        let low = sched.create("low", 20, body, 0).unwrap();

        for now in 1..=11 {
            sched.tick(now);
        }
        assert_eq!(sched.thread_stats(low).map(|s| s.priority), Some(PRI_DEFAULT));
        assert!(!sched.yield_requested());

        sched.tick(12);
        assert!(sched.yield_requested());
        sched.interrupt_return();

        assert_eq!(sched.tid(), low);
        assert_eq!(sched.get_priority(), PRI_DEFAULT + 1);
        assert_eq!(sched.current().base_priority, 20);

        // main now ages while it waits and wins the CPU back.
        sched.tick(13);
        assert!(!sched.yield_requested());
        sched.tick(14);
        assert!(sched.yield_requested());
        sched.interrupt_return();
        assert_eq!(sched.tid(), 1);
        assert_eq!(sched.get_priority(), PRI_DEFAULT + 2);
        sched.check_invariants();
    }

    #[test]
    fn test_set_priority_yields_when_outranked() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        let worker = sched.create("worker", 20, body, 0).unwrap();
        sched.set_priority(25);
        assert_eq!(sched.tid(), 1);

        sched.set_priority(10);
        assert_eq!(sched.tid(), worker);
        assert_eq!(sched.thread_stats(1).map(|s| s.priority), Some(10));
        sched.check_invariants();
    }

    #[test]
    fn test_get_priority_is_idempotent() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        assert_eq!(sched.get_priority(), sched.get_priority());
    }

    #[test]
    #[should_panic(expected = "outside")]
    fn test_out_of_range_priority_aborts() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        let _ = sched.create("bad", PRI_MAX + 1, body, 0);
    }

    #[test]
    fn test_pool_exhaustion_is_reported() {
        let arch: &'static SimArch = Box::leak(Box::new(SimArch::new()));
        let sched = Scheduler::new(arch, SchedConfig::default().with_max_threads(2).with_stack_size(1024));
        sched.start().unwrap();

        sched.create("one", 10, body, 0).unwrap();
        assert_eq!(
            sched.create("two", 10, body, 0),
            Err(SchedulerError::ThreadLimitReached { current: 2, max: 2 })
        );
    }

    #[test]
    fn test_mlfqs_ignores_set_priority() {
        let (sched, _) = boot_policy(PriorityPolicy::Mlfqs);
        sched.set_priority(3);
        assert_eq!(sched.get_priority(), PRI_DEFAULT);
    }

    #[test]
    fn test_mlfqs_nice_and_recent_cpu() {
        let (sched, _) = boot(SchedConfig::new(PriorityPolicy::Mlfqs).with_time_slice(1000));
        assert_eq!(sched.get_load_avg(), 0);

        sched.set_nice(5);
        assert_eq!(sched.get_nice(), 5);
        assert_eq!(sched.get_priority(), PRI_MAX - 10);

        sched.set_nice(100);
        assert_eq!(sched.get_nice(), 20);

        for now in 1..=3 {
            sched.tick(now);
        }
        assert_eq!(sched.get_recent_cpu(), 300);
    }

    #[test]
    fn test_mlfqs_set_nice_yields_to_outranking_peer() {
        let (sched, _) = boot(SchedConfig::new(PriorityPolicy::Mlfqs).with_time_slice(1000));
        for now in 1..=4 {
            sched.tick(now);
        }
        assert_eq!(sched.get_priority(), PRI_MAX - 1);

        // Inherits recent_cpu, so it ties with main and does not preempt.
        let peer = sched.create("peer", PRI_DEFAULT, body, 0).unwrap();
        assert_eq!(sched.tid(), 1);
        assert_eq!(sched.thread_stats(peer).map(|s| s.priority), Some(PRI_MAX - 1));

        sched.set_nice(20);
        assert_eq!(sched.tid(), peer);
        assert_eq!(sched.state_of(1), Some(ThreadState::Ready));
        assert_eq!(sched.thread_stats(1).map(|s| s.priority), Some(PRI_MAX - 1 - 40));
        sched.check_invariants();
    }

    #[test]
    fn test_mlfqs_recompute_requests_preemption() {
        let (sched, _) = boot(SchedConfig::new(PriorityPolicy::Mlfqs).with_time_slice(1000));
        for now in 1..=4 {
            sched.tick(now);
        }
        let peer = sched.create("peer", PRI_DEFAULT, body, 0).unwrap();

        for now in 5..=7 {
            sched.tick(now);
            assert!(!sched.yield_requested());
        }
        // main has burnt 8 ticks against the peer's 4.
        sched.tick(8);
        assert_eq!(sched.get_priority(), PRI_MAX - 2);
        assert!(sched.yield_requested());

        sched.interrupt_return();
        assert_eq!(sched.tid(), peer);
        assert_eq!(sched.get_priority(), PRI_MAX - 1);
        sched.check_invariants();
    }

    #[test]
    fn test_mlfqs_saturated_recent_cpu_is_reported() {
        let (sched, _) = boot(SchedConfig::new(PriorityPolicy::Mlfqs).with_time_slice(1000));
        {
            let mut state = sched.state.lock();
            let cur = state.current;
            state.threads[cur].set_recent_cpu(Fp::from_int(RECENT_CPU_MAX));
        }
        sched.tick(4);

        assert_eq!(sched.get_recent_cpu(), RECENT_CPU_MAX * 100);
        assert_eq!(sched.current().recent_cpu, RECENT_CPU_MAX * 100);
        assert_eq!(sched.get_priority(), PRI_MIN);
        assert_eq!(sched.stats().total_threads, 2);
    }

    #[test]
    fn test_mlfqs_child_inherits_nice() {
        let (sched, _) = boot_policy(PriorityPolicy::Mlfqs);
        sched.set_nice(10);
        let child = sched.create("child", PRI_MAX, body, 0).unwrap();
        let stats = sched.thread_stats(child).unwrap();
        assert_eq!(stats.nice, 10);
        assert_eq!(stats.priority, PRI_MAX - 20);
        assert_eq!(sched.tid(), 1);
    }

    #[test]
    fn test_mlfqs_quiet_system_stays_at_max_priority() {
        let (sched, _) = boot(SchedConfig::new(PriorityPolicy::Mlfqs).with_time_slice(1000));
        sched.sleep_until(1000);
        assert_eq!(sched.tid(), 2);

        for now in 1..=100 {
            sched.tick(now);
        }
        assert_eq!(sched.get_load_avg(), 0);
        let main = sched.thread_stats(1).unwrap();
        assert_eq!(main.recent_cpu, 0);
        assert_eq!(main.priority, PRI_MAX);
        assert_eq!(sched.stats().idle_ticks, 100);
    }

    #[test]
    fn test_process_data_counts_as_user_time() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        assert!(sched.set_process_data(Box::new(7u32)).is_none());
        sched.tick(1);
        assert_eq!(sched.stats().user_ticks, 1);

        let seen = sched.with_process_data(|p| p.and_then(|d| d.downcast_mut::<u32>()).map(|v| *v));
        assert_eq!(seen, Some(7));
        assert!(sched.take_process_data().is_some());
        assert!(sched.take_process_data().is_none());
    }

    #[test]
    #[should_panic(expected = "is corrupted")]
    fn test_stack_overflow_is_detected() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        sched.create("victim", 40, body, 0).unwrap();
        {
            let mut state = sched.state.lock();
            let cur = state.current;
            state.threads[cur].stack_mut().unwrap().smash_for_test();
        }
        sched.current();
    }

    #[test]
    fn test_stats_track_spawns_and_switches() {
        let (sched, _) = boot_policy(PriorityPolicy::Priority);
        sched.create("a", 10, body, 0).unwrap();
        sched.yield_now();
        let stats = sched.stats();
        // idle + a
        assert_eq!(stats.total_spawns, 2);
        assert_eq!(stats.yields, 1);
        assert_eq!(stats.total_threads, 3);
        assert_eq!(stats.ready_queue_len, 1);
        sched.print_stats();
    }
}
