//! Scheduler core module
//!
//! Run-queue containers, the priority engine and the scheduler itself.

pub mod error;
pub mod policy;
pub mod ready_queue;
pub mod registry;
pub mod scheduler;
pub mod sleep;
pub mod statistics;

pub use error::{SchedulerError, SchedulerResult};
pub use policy::PriorityEngine;
pub use scheduler::{PendingCleanup, Scheduler};
pub use statistics::SchedulerStats;
