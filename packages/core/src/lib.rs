//! Core queue types for the job dispatch system.
//!
//! This crate contains the building blocks shared by every queue in the workspace:
//! - `LinkedQueue` and `Chain`, a lock-guarded doubly-linked queue with O(1)
//!   removal through `NodeHandle`s
//! - `QueueHook`, the domain callback each specialized queue supplies, and
//!   `run_maintenance`, which drives it over a mixed set of queues
//! - `JobRecord` and `JobStatus` for work items
//! - `JobQueue`, the identifier-indexed queue with the status-driven dequeue protocol
//! - Events and configuration for the job queue

mod config;
mod error;
mod events;
mod hook;
mod job;
mod job_queue;
mod linked;

pub use config::{ConfigError, JobQueueConfig, UnmatchedStatusPolicy};
pub use error::QueueError;
pub use events::JobQueueEvent;
pub use hook::{QueueHook, run_maintenance};
pub use job::{JobId, JobRecord, JobStatus};
pub use job_queue::{JobObserver, JobQueue};
pub use linked::{Chain, ChainIter, Iter, LinkedQueue, NodeHandle, Peek, QueueId};
