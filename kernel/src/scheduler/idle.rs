//! Idle Thread Implementation
//!
//! Runs only when the ready queue is empty. Never queued: each pass parks
//! itself Blocked and halts until the next interrupt; the scheduler picks it
//! again directly whenever nothing else is runnable.

use super::core::Scheduler;

/// Idle thread entry point
pub fn idle_thread_entry(_: usize) {
    let sched = match super::try_scheduler() {
        Ok(sched) => sched,
        Err(err) => {
            log::error!("[SCHED] Idle thread started without a scheduler: {}", err);
            return;
        }
    };

    log::debug!("[SCHED] Idle thread started");
    loop {
        idle_step(sched);
    }
}

/// One pass of the idle loop.
pub fn idle_step(sched: &Scheduler) {
    let arch = sched.arch();
    arch.disable_interrupts();
    sched.block();

    // Re-enable and halt atomically; a tick in between would be slept through.
    arch.wait_for_interrupt();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::SimArch;
    use crate::arch::Arch;
    use crate::scheduler::config::SchedConfig;
    use crate::scheduler::thread::ThreadState;
    use alloc::boxed::Box;

    fn booted() -> (Scheduler, &'static SimArch) {
        let arch: &'static SimArch = Box::leak(Box::new(SimArch::new()));
        let sched = Scheduler::new(arch, SchedConfig::default().with_max_threads(4).with_stack_size(1024));
        sched.start().unwrap();
        (sched, arch)
    }

    #[test]
    fn test_idle_runs_when_nothing_is_ready() {
        let (sched, arch) = booted();
        sched.sleep_until(50);
        assert_eq!(&*sched.name(), "idle");

        idle_step(&sched);
        // Still nothing ready: the idle thread is picked again and halts.
        assert_eq!(&*sched.name(), "idle");
        assert_eq!(sched.current().state, ThreadState::Running);
        assert_eq!(arch.halt_count(), 1);
        assert!(arch.interrupts_enabled());
    }

    #[test]
    fn test_idle_ticks_are_counted_separately() {
        let (sched, _) = booted();
        sched.sleep_until(3);
        sched.tick(1);
        sched.tick(2);
        assert_eq!(sched.stats().idle_ticks, 2);
        assert_eq!(sched.stats().kernel_ticks, 0);

        sched.tick(3);
        sched.interrupt_return();
        assert_eq!(&*sched.name(), "main");

        let mut idle_state = None;
        sched.for_each_thread(|t| {
            if t.name() == "idle" {
                idle_state = Some(t.state());
            }
        });
        assert_eq!(idle_state, Some(ThreadState::Blocked));
    }
}
