#![allow(dead_code)]

use queue_core::{JobQueue, JobRecord, JobStatus, LinkedQueue};

/// Job queue pre-loaded with `(id, status)` pairs in order.
pub fn job_queue_with(jobs: &[(&str, JobStatus)]) -> Result<JobQueue, queue_core::QueueError> {
    let queue = JobQueue::default();
    for (id, status) in jobs {
        queue.enqueue(JobRecord::new(*id, *status))?;
    }
    Ok(queue)
}

/// Values reachable by a full traversal, in order.
pub fn drain_view<T: Clone, S>(queue: &LinkedQueue<T, S>) -> Vec<T> {
    queue.iter().collect()
}
