//! Priority engine
//!
//! Per-tick priority bookkeeping for the policy selected at boot:
//! - `Priority`: static priorities, nothing to do per tick
//! - `Aging`: every ready thread gains one level per tick, up to `PRI_MAX`;
//!   only `set_priority` lowers it again
//! - `Mlfqs`: recent CPU accounting, a once-per-second load average and
//!   decay, and a priority recompute every fourth tick

use crate::scheduler::config::{PriorityPolicy, PRIORITY_RECOMPUTE_TICKS};
use crate::scheduler::core::ready_queue::ReadyQueue;
use crate::scheduler::core::registry::ThreadRegistry;
use crate::scheduler::mlfqs::{self, Fp};
use crate::scheduler::thread::{SlotId, Thread, ThreadTable};

/// Everything a periodic pass may read or rewrite.
pub struct RunQueues<'a> {
    pub threads: &'a mut ThreadTable,
    pub ready: &'a mut ReadyQueue,
    pub registry: &'a ThreadRegistry,
    pub current: SlotId,
    pub idle: Option<SlotId>,
}

pub struct PriorityEngine {
    policy: PriorityPolicy,
    timer_freq: u64,
    load_avg: Fp,
}

impl PriorityEngine {
    pub const fn new(policy: PriorityPolicy, timer_freq: u64) -> Self {
        Self {
            policy,
            timer_freq,
            load_avg: Fp::ZERO,
        }
    }

    pub fn policy(&self) -> PriorityPolicy {
        self.policy
    }

    pub fn load_avg(&self) -> Fp {
        self.load_avg
    }

    /// Priority a new thread starts with. Under MLFQS the request is
    /// ignored and the priority follows from the inherited nice/recent CPU.
    pub fn initial_priority(&self, requested: i32, thread: &Thread) -> i32 {
        if self.policy.is_mlfqs() {
            mlfqs::priority_for(thread.recent_cpu(), thread.nice())
        } else {
            requested
        }
    }

    /// Recompute one thread's priority from its own nice/recent CPU.
    pub fn refresh(&self, thread: &mut Thread) {
        if self.policy.is_mlfqs() {
            thread.set_effective_priority(mlfqs::priority_for(thread.recent_cpu(), thread.nice()));
        }
    }

    /// Periodic bookkeeping for tick `now`.
    pub fn on_tick(&mut self, now: u64, rq: RunQueues<'_>) {
        match self.policy {
            PriorityPolicy::Priority => {}
            PriorityPolicy::Aging => Self::age_ready(rq),
            PriorityPolicy::Mlfqs => self.mlfqs_tick(now, rq),
        }
    }

    /// Aging is uniform, so the queue stays sorted.
    fn age_ready(rq: RunQueues<'_>) {
        for slot in rq.ready.iter() {
            rq.threads[slot].age();
        }
    }

    fn mlfqs_tick(&mut self, now: u64, rq: RunQueues<'_>) {
        let current = rq.current;
        let idle = rq.idle;
        let running_idle = idle == Some(current);

        if !running_idle {
            let thread = &mut rq.threads[current];
            thread.set_recent_cpu(mlfqs::charge_tick(thread.recent_cpu()));
        }

        if self.timer_freq != 0 && now % self.timer_freq == 0 {
            let ready_count = rq.ready.len() + usize::from(!running_idle);
            self.load_avg = mlfqs::next_load_avg(self.load_avg, ready_count);

            for slot in rq.registry.iter().filter(|&s| Some(s) != idle) {
                let thread = &mut rq.threads[slot];
                let decayed = mlfqs::decay_recent_cpu(self.load_avg, thread.recent_cpu(), thread.nice());
                thread.set_recent_cpu(decayed);
            }
            log::trace!("[SCHED] load_avg {} at tick {}", self.load_avg, now);
        }

        if now % PRIORITY_RECOMPUTE_TICKS == 0 {
            for slot in rq.registry.iter().filter(|&s| Some(s) != idle) {
                self.refresh(&mut rq.threads[slot]);
            }
            rq.ready.resort(rq.threads);
        }
    }
}
