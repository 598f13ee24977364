//! Multi-level feedback queue arithmetic
//!
//! Pure functions shared by the periodic recompute pass, `set_nice` and
//! thread creation. Nothing here touches scheduler state.

pub mod fixed;

pub use fixed::{Fixed, Fp};

use crate::scheduler::config::{clamp_priority, PRI_MAX, RECENT_CPU_MAX};

/// `PRI_MAX - recent_cpu/4 - nice*2`, truncated toward zero and clamped.
pub fn priority_for(recent_cpu: Fp, nice: i32) -> i32 {
    let raw = Fp::from_int(PRI_MAX) - recent_cpu.div_int(4) - Fp::from_int(nice).mul_int(2);
    clamp_priority(raw.to_int_trunc())
}

/// One-second decay: `(2*load_avg)/(2*load_avg + 1) * recent_cpu + nice`.
pub fn decay_recent_cpu(load_avg: Fp, recent_cpu: Fp, nice: i32) -> Fp {
    let twice_load = load_avg.mul_int(2);
    let coefficient = twice_load / twice_load.add_int(1);
    clamp_recent_cpu(coefficient * recent_cpu + Fp::from_int(nice))
}

/// Per-tick charge to the running thread.
pub fn charge_tick(recent_cpu: Fp) -> Fp {
    clamp_recent_cpu(recent_cpu.add_int(1))
}

/// Clamp into `[-RECENT_CPU_MAX, RECENT_CPU_MAX]`.
pub fn clamp_recent_cpu(recent_cpu: Fp) -> Fp {
    recent_cpu.clamp(Fp::from_int(-RECENT_CPU_MAX), Fp::from_int(RECENT_CPU_MAX))
}

/// One-second update: `(59*load_avg + ready_count) / 60`.
pub fn next_load_avg(load_avg: Fp, ready_count: usize) -> Fp {
    (load_avg.mul_int(59) + Fp::from_int(ready_count as i32)).div_int(60)
}
