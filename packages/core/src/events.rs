//! Event types emitted by the job queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{JobId, JobRecord, JobStatus, QueueId};

/// Events emitted by [`JobQueue`](crate::JobQueue) after each state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobQueueEvent {
    /// A job was appended to the tail.
    Enqueued {
        queue_id: QueueId,
        job_id: JobId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A job was handed to the caller of `dequeue`.
    Dispatched {
        queue_id: QueueId,
        job_id: JobId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A popped job went back to the tail.
    Requeued {
        queue_id: QueueId,
        job_id: JobId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A popped job had no dispatch rule and was dropped.
    Discarded {
        queue_id: QueueId,
        job_id: JobId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
    /// A job was removed by identifier.
    Removed {
        queue_id: QueueId,
        job_id: JobId,
        status: JobStatus,
        timestamp: DateTime<Utc>,
    },
}

impl JobQueueEvent {
    pub(crate) fn enqueued(queue_id: QueueId, job: &JobRecord) -> Self {
        JobQueueEvent::Enqueued {
            queue_id,
            job_id: job.id.clone(),
            status: job.status,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn dispatched(queue_id: QueueId, job: &JobRecord) -> Self {
        JobQueueEvent::Dispatched {
            queue_id,
            job_id: job.id.clone(),
            status: job.status,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn requeued(queue_id: QueueId, job: &JobRecord) -> Self {
        JobQueueEvent::Requeued {
            queue_id,
            job_id: job.id.clone(),
            status: job.status,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn discarded(queue_id: QueueId, job: &JobRecord) -> Self {
        JobQueueEvent::Discarded {
            queue_id,
            job_id: job.id.clone(),
            status: job.status,
            timestamp: Utc::now(),
        }
    }

    pub(crate) fn removed(queue_id: QueueId, job: &JobRecord) -> Self {
        JobQueueEvent::Removed {
            queue_id,
            job_id: job.id.clone(),
            status: job.status,
            timestamp: Utc::now(),
        }
    }

    /// Get the timestamp of the event.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            JobQueueEvent::Enqueued { timestamp, .. }
            | JobQueueEvent::Dispatched { timestamp, .. }
            | JobQueueEvent::Requeued { timestamp, .. }
            | JobQueueEvent::Discarded { timestamp, .. }
            | JobQueueEvent::Removed { timestamp, .. } => *timestamp,
        }
    }

    /// Get the queue ID associated with this event.
    pub fn queue_id(&self) -> QueueId {
        match self {
            JobQueueEvent::Enqueued { queue_id, .. }
            | JobQueueEvent::Dispatched { queue_id, .. }
            | JobQueueEvent::Requeued { queue_id, .. }
            | JobQueueEvent::Discarded { queue_id, .. }
            | JobQueueEvent::Removed { queue_id, .. } => *queue_id,
        }
    }

    /// Get the job ID associated with this event.
    pub fn job_id(&self) -> &JobId {
        match self {
            JobQueueEvent::Enqueued { job_id, .. }
            | JobQueueEvent::Dispatched { job_id, .. }
            | JobQueueEvent::Requeued { job_id, .. }
            | JobQueueEvent::Discarded { job_id, .. }
            | JobQueueEvent::Removed { job_id, .. } => job_id,
        }
    }

    /// Status the job carried when the event happened.
    pub fn status(&self) -> JobStatus {
        match self {
            JobQueueEvent::Enqueued { status, .. }
            | JobQueueEvent::Dispatched { status, .. }
            | JobQueueEvent::Requeued { status, .. }
            | JobQueueEvent::Discarded { status, .. }
            | JobQueueEvent::Removed { status, .. } => *status,
        }
    }

    /// Get a short description of this event for logging.
    pub fn description(&self) -> String {
        match self {
            JobQueueEvent::Enqueued { job_id, status, .. } => {
                format!("Job {} enqueued ({})", job_id, status)
            }
            JobQueueEvent::Dispatched { job_id, status, .. } => {
                format!("Job {} dispatched ({})", job_id, status)
            }
            JobQueueEvent::Requeued { job_id, status, .. } => {
                format!("Job {} moved to tail ({})", job_id, status)
            }
            JobQueueEvent::Discarded { job_id, status, .. } => {
                format!("Job {} discarded: no rule for status {}", job_id, status)
            }
            JobQueueEvent::Removed { job_id, .. } => format!("Job {} removed by id", job_id),
        }
    }
}
