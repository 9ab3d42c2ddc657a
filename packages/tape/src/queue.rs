//! FIFO of tape drive operations.

use queue_core::{LinkedQueue, NodeHandle, QueueError, QueueHook, QueueId};

use crate::operation::{OperationKind, TapeOperation};

/// Queue of pending drive operations for one drive.
#[derive(Debug)]
pub struct TapeDriveQueue {
    drive: String,
    queue: LinkedQueue<TapeOperation>,
}

impl TapeDriveQueue {
    pub fn new(drive: impl Into<String>) -> Self {
        let drive = drive.into();
        let queue = LinkedQueue::new();
        tracing::info!(drive = %drive, id = %queue.id(), "Created tape drive queue");
        Self { drive, queue }
    }

    pub fn id(&self) -> QueueId {
        self.queue.id()
    }

    pub fn drive(&self) -> &str {
        &self.drive
    }

    /// Schedule an operation at the tail.
    pub fn push(&self, op: impl Into<TapeOperation>) -> NodeHandle {
        let op = op.into();
        tracing::debug!(drive = %self.drive, kind = %op.kind(), "Queued tape operation");
        self.queue.push_back(op)
    }

    /// Schedule an operation ahead of everything else.
    pub fn push_urgent(&self, op: impl Into<TapeOperation>) -> NodeHandle {
        self.queue.push_front(op.into())
    }

    /// Take the next operation, if any.
    pub fn take_next(&self) -> Option<TapeOperation> {
        self.queue.pop_front().ok()
    }

    /// Withdraw a scheduled operation.
    pub fn cancel(&self, handle: NodeHandle) -> Result<TapeOperation, QueueError> {
        self.queue.remove(handle)
    }

    pub fn peek(&self) -> Result<TapeOperation, QueueError> {
        self.queue.front_cloned()
    }

    pub fn size(&self) -> usize {
        self.queue.size()
    }

    pub fn empty(&self) -> bool {
        self.queue.empty()
    }

    /// Pending operation kinds in order.
    pub fn pending(&self) -> Vec<OperationKind> {
        self.queue.snapshot().iter().map(TapeOperation::kind).collect()
    }
}

impl QueueHook for TapeDriveQueue {
    fn kind(&self) -> &'static str {
        "tape"
    }

    /// Log the drive's pending work and the operation it will run next.
    fn special_operation(&self) {
        match self.queue.front_cloned() {
            Ok(next) => tracing::info!(
                drive = %self.drive,
                kind = self.kind(),
                pending = self.size(),
                next = %next.kind(),
                "Performing special operation"
            ),
            Err(_) => tracing::info!(
                drive = %self.drive,
                kind = self.kind(),
                "Performing special operation on idle drive"
            ),
        }
    }
}
