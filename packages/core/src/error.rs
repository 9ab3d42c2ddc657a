//! Error types for queue operations.

use thiserror::Error;

use crate::job::JobId;
use crate::linked::NodeHandle;

/// Structural misuse of a queue.
///
/// Business absence ("nothing to dequeue", "no job with this id") is never
/// reported through this type; those paths return `Option::None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// A boundary operation was called on an empty queue.
    #[error("queue underflow: {operation} called on an empty queue")]
    Underflow { operation: &'static str },

    /// The handle is stale, foreign, or does not resolve to a linked node.
    #[error("invalid node handle {handle}: {reason}")]
    InvalidHandle {
        handle: NodeHandle,
        reason: &'static str,
    },

    /// A job with the same identifier is already enqueued.
    #[error("job {0} is already enqueued")]
    DuplicateJobId(JobId),

    /// The chain or its index no longer satisfy their invariants.
    #[error("queue corrupted: {0}")]
    Corrupted(String),
}

impl QueueError {
    /// True for failures caused by accessing an empty queue.
    pub fn is_underflow(&self) -> bool {
        matches!(self, QueueError::Underflow { .. })
    }

    /// True for failures caused by a bad argument (handle or duplicate id).
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            QueueError::InvalidHandle { .. } | QueueError::DuplicateJobId(_)
        )
    }
}
