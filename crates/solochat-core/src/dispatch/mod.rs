//! FIFO work queue and its single-consumer dispatch loop.

pub mod queue;
pub(crate) mod worker;

pub use queue::{work_queue, OutboundCommand, QueuedWork, WorkQueue, WorkReceiver};
