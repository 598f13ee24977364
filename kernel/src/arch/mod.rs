// src/arch/mod.rs
// Abstraction d'architecture - interface consommée par l'ordonnanceur

use crate::scheduler::thread::ThreadContext;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod x86_64;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

/// First code run by a new thread after its first switch.
pub type ThreadTrampoline = extern "C" fn() -> !;

/// Machine services the scheduler relies on.
///
/// Single core: "disabling interrupts" is the only mutual exclusion the
/// scheduler needs around its queues.
pub trait Arch: Sync {
    fn interrupts_enabled(&self) -> bool;

    fn disable_interrupts(&self);

    fn enable_interrupts(&self);

    /// Lay out the first switch frame of a new thread so that switching to
    /// `ctx` lands in `entry` on the stack ending at `stack_top`.
    ///
    /// # Safety
    /// `stack_top` must be the top of a writable stack owned by the thread
    /// and not yet in use.
    unsafe fn init_context(&self, ctx: &mut ThreadContext, stack_top: usize, entry: ThreadTrampoline);

    /// Save the running context into `prev` and resume `next`.
    ///
    /// Returns when some later switch resumes `prev`.
    ///
    /// # Safety
    /// Both pointers must reference live contexts; interrupts must be off.
    unsafe fn switch_threads(&self, prev: *mut ThreadContext, next: *const ThreadContext);

    /// Enable interrupts and halt until the next one, atomically.
    fn wait_for_interrupt(&self);
}

/// RAII guard for disabling/restoring interrupts
pub struct InterruptGuard<'a> {
    arch: &'a dyn Arch,
    was_enabled: bool,
}

impl<'a> InterruptGuard<'a> {
    pub fn new(arch: &'a dyn Arch) -> Self {
        let was_enabled = arch.interrupts_enabled();
        if was_enabled {
            arch.disable_interrupts();
        }
        Self { arch, was_enabled }
    }

    pub fn was_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        if self.was_enabled {
            self.arch.enable_interrupts();
        }
    }
}
