//! x86_64 bare-metal implementation of `Arch`
//!
//! Windowed switch: callee-saved registers go on the outgoing stack and only
//! RSP is stored in the context. A new thread's stack is pre-filled so the
//! first switch pops zeroed registers and `ret`s into the trampoline.

use core::arch::{asm, global_asm};

use super::{Arch, ThreadTrampoline};
use crate::scheduler::thread::ThreadContext;

const RFLAGS_IF: u64 = 1 << 9;

/// Callee-saved registers pushed by `minikern_switch_threads`.
const SAVED_REGISTERS: usize = 6;

global_asm!(
    ".global minikern_switch_threads",
    "minikern_switch_threads:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, [rsi]",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
);

extern "C" {
    fn minikern_switch_threads(prev: *mut ThreadContext, next: *const ThreadContext);
}

pub struct X86_64;

impl Arch for X86_64 {
    fn interrupts_enabled(&self) -> bool {
        let rflags: u64;
        unsafe {
            asm!("pushfq; pop {}", out(reg) rflags, options(nomem, preserves_flags));
        }
        rflags & RFLAGS_IF != 0
    }

    fn disable_interrupts(&self) {
        unsafe { asm!("cli", options(nomem, nostack)) }
    }

    fn enable_interrupts(&self) {
        unsafe { asm!("sti", options(nomem, nostack)) }
    }

    unsafe fn init_context(&self, ctx: &mut ThreadContext, stack_top: usize, entry: ThreadTrampoline) {
        // At the trampoline's first instruction RSP must be 8 mod 16, as
        // after a `call`; the slot above the entry address is a null return.
        let top = (stack_top & !0xf) as *mut usize;
        let frame = top.sub(2 + SAVED_REGISTERS);
        for i in 0..SAVED_REGISTERS {
            frame.add(i).write(0);
        }
        frame.add(SAVED_REGISTERS).write(entry as usize);
        frame.add(SAVED_REGISTERS + 1).write(0);

        ctx.sp = frame as usize;
        ctx.ip = entry as usize;
    }

    unsafe fn switch_threads(&self, prev: *mut ThreadContext, next: *const ThreadContext) {
        minikern_switch_threads(prev, next);
    }

    fn wait_for_interrupt(&self) {
        // `sti` takes effect after the next instruction, so no interrupt can
        // slip in between the two.
        unsafe { asm!("sti; hlt", options(nomem, nostack)) }
    }
}
