//! Host model of the machine
//!
//! Tracks the interrupt flag and counts switches and halts. A switch returns
//! immediately, so after `yield_now` the caller simply continues as the
//! thread that was switched to.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::{Arch, ThreadTrampoline};
use crate::scheduler::thread::ThreadContext;

pub struct SimArch {
    interrupts: AtomicBool,
    switches: AtomicUsize,
    halts: AtomicUsize,
}

impl SimArch {
    /// Boot state: interrupts off.
    pub const fn new() -> Self {
        Self {
            interrupts: AtomicBool::new(false),
            switches: AtomicUsize::new(0),
            halts: AtomicUsize::new(0),
        }
    }

    pub fn switch_count(&self) -> usize {
        self.switches.load(Ordering::Relaxed)
    }

    pub fn halt_count(&self) -> usize {
        self.halts.load(Ordering::Relaxed)
    }
}

impl Default for SimArch {
    fn default() -> Self {
        Self::new()
    }
}

impl Arch for SimArch {
    fn interrupts_enabled(&self) -> bool {
        self.interrupts.load(Ordering::SeqCst)
    }

    fn disable_interrupts(&self) {
        self.interrupts.store(false, Ordering::SeqCst);
    }

    fn enable_interrupts(&self) {
        self.interrupts.store(true, Ordering::SeqCst);
    }

    unsafe fn init_context(&self, ctx: &mut ThreadContext, stack_top: usize, entry: ThreadTrampoline) {
        ctx.sp = stack_top;
        ctx.ip = entry as usize;
    }

    unsafe fn switch_threads(&self, _prev: *mut ThreadContext, _next: *const ThreadContext) {
        self.switches.fetch_add(1, Ordering::Relaxed);
    }

    fn wait_for_interrupt(&self) {
        self.enable_interrupts();
        self.halts.fetch_add(1, Ordering::Relaxed);
    }
}
