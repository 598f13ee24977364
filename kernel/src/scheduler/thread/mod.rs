//! Thread module

pub mod stack;
pub mod state;
pub mod table;
pub mod thread;
pub mod tid;

pub use stack::Stack;
pub use state::ThreadState;
pub use table::{SlotId, ThreadTable};
pub use thread::{ProcessData, Thread, ThreadContext, ThreadFn, ThreadStats};
pub use tid::{ThreadId, TidAllocator};
