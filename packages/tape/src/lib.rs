//! Tape drive operation queue.
//!
//! A second specialization of [`queue_core::LinkedQueue`]: plain FIFO of
//! drive operations plus the required [`queue_core::QueueHook`].

mod operation;
mod queue;

pub use operation::{OperationKind, TapeError, TapeOperation};
pub use queue::TapeDriveQueue;
