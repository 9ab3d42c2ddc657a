//! Identifier-indexed job queue with status-driven dequeue.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::{JobQueueConfig, UnmatchedStatusPolicy};
use crate::error::QueueError;
use crate::events::JobQueueEvent;
use crate::hook::QueueHook;
use crate::job::{JobId, JobRecord, JobStatus};
use crate::linked::{LinkedQueue, NodeHandle, QueueId};

/// Identifier index kept under the chain's lock.
type JobIndex = HashMap<JobId, NodeHandle>;

/// Callback receiving job queue events.
pub type JobObserver = Arc<dyn Fn(&JobQueueEvent) + Send + Sync>;

/// Job queue that dispatches by status instead of strict FIFO.
///
/// The identifier index lives next to the chain inside one lock, so a node is
/// never linked without its index entry or indexed without being linked.
/// Construct one per use site and share it with `Arc<JobQueue>`.
pub struct JobQueue {
    config: JobQueueConfig,
    queue: LinkedQueue<JobRecord, JobIndex>,
    observers: RwLock<Vec<JobObserver>>,
}

impl fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobQueue")
            .field("config", &self.config)
            .field("id", &self.queue.id())
            .field("size", &self.size())
            .finish()
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(JobQueueConfig::default())
    }
}

/// What one `dequeue` call did with the popped head.
enum Outcome {
    Dispatched(JobRecord),
    Requeued,
    Discarded,
}

impl JobQueue {
    pub fn new(config: JobQueueConfig) -> Self {
        let queue = LinkedQueue::with_state(JobIndex::new());
        tracing::info!(
            queue = %config.name,
            id = %queue.id(),
            unmatched_status = %config.unmatched_status,
            "Created job queue"
        );
        Self {
            config,
            queue,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn id(&self) -> QueueId {
        self.queue.id()
    }

    pub fn config(&self) -> &JobQueueConfig {
        &self.config
    }

    /// Register an observer for queue events.
    ///
    /// Observers run after the queue lock is released and may call back into the queue.
    pub fn subscribe(&self, observer: impl Fn(&JobQueueEvent) + Send + Sync + 'static) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    fn broadcast(&self, event: &JobQueueEvent) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer(event);
        }
    }

    /// Append a job at the tail and index it by identifier.
    ///
    /// Fails with [`QueueError::DuplicateJobId`] if a job with the same
    /// identifier is already enqueued.
    pub fn enqueue(&self, job: JobRecord) -> Result<(), QueueError> {
        let queue_id = self.id();
        let result = self.queue.with_lock(|chain, index| {
            if index.contains_key(&job.id) {
                return Err(QueueError::DuplicateJobId(job.id.clone()));
            }
            let event = JobQueueEvent::enqueued(queue_id, &job);
            let id = job.id.clone();
            let handle = chain.push_back(job);
            index.insert(id, handle);
            Ok(event)
        });

        match result {
            Ok(event) => {
                tracing::debug!(queue = %self.config.name, job_id = %event.job_id(), "{}", event.description());
                self.broadcast(&event);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(queue = %self.config.name, "Rejected enqueue: {}", err);
                Err(err)
            }
        }
    }

    /// Pop the head job and classify it by status.
    ///
    /// One pop per call:
    /// - `Queuing`, `Retry`, `Resume`: the job leaves the queue and is returned.
    /// - `Suspending`, `Cancelled`: the job moves to the tail and `None` is returned.
    /// - anything else: handled by [`UnmatchedStatusPolicy`]; `None` is returned.
    ///
    /// `None` is also returned for an empty queue. Callers poll again.
    pub fn dequeue(&self) -> Option<JobRecord> {
        let queue_id = self.id();
        let policy = self.config.unmatched_status;
        let (outcome, event) = self.queue.with_lock(|chain, index| {
            let job = chain.pop_front().ok()?;
            let status = job.status;

            let requeue = status.is_requeued()
                || (!status.is_dispatchable() && policy == UnmatchedStatusPolicy::Requeue);
            if requeue {
                let event = JobQueueEvent::requeued(queue_id, &job);
                let id = job.id.clone();
                let handle = chain.push_back(job);
                index.insert(id, handle);
                return Some((Outcome::Requeued, event));
            }

            index.remove(&job.id);
            if status.is_dispatchable() {
                let event = JobQueueEvent::dispatched(queue_id, &job);
                Some((Outcome::Dispatched(job), event))
            } else {
                Some((Outcome::Discarded, JobQueueEvent::discarded(queue_id, &job)))
            }
        })?;

        match &outcome {
            Outcome::Discarded => {
                tracing::warn!(queue = %self.config.name, job_id = %event.job_id(), "{}", event.description());
            }
            Outcome::Dispatched(_) | Outcome::Requeued => {
                tracing::debug!(queue = %self.config.name, job_id = %event.job_id(), "{}", event.description());
            }
        }
        self.broadcast(&event);

        match outcome {
            Outcome::Dispatched(job) => Some(job),
            Outcome::Requeued | Outcome::Discarded => None,
        }
    }

    /// Remove a job by identifier regardless of its position.
    pub fn dequeue_by_job_id(&self, job_id: &str) -> Option<JobRecord> {
        let queue_id = self.id();
        let removed = self.queue.with_lock(|chain, index| {
            let handle = *index.get(job_id)?;
            let removed = chain.remove(handle);
            index.remove(job_id);
            Some(removed)
        })?;

        match removed {
            Ok(job) => {
                let event = JobQueueEvent::removed(queue_id, &job);
                tracing::debug!(queue = %self.config.name, job_id = %job.id, "{}", event.description());
                self.broadcast(&event);
                Some(job)
            }
            Err(err) => {
                tracing::error!(
                    queue = %self.config.name,
                    job_id,
                    "Dropped stale index entry: {}",
                    err
                );
                None
            }
        }
    }

    /// True if a job with this identifier is enqueued.
    pub fn contains(&self, job_id: &str) -> bool {
        self.queue.with_lock(|_, index| index.contains_key(job_id))
    }

    /// Copy of the enqueued job with this identifier.
    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.queue.with_lock(|chain, index| {
            let handle = index.get(job_id)?;
            chain.get(*handle).ok().cloned()
        })
    }

    /// Change the status of an enqueued job in place. Returns false if the job
    /// is not enqueued.
    pub fn update_status(&self, job_id: &str, status: JobStatus) -> bool {
        self.queue.with_lock(|chain, index| {
            let Some(handle) = index.get(job_id) else {
                return false;
            };
            match chain.get_mut(*handle) {
                Ok(job) => {
                    job.set_status(status);
                    true
                }
                Err(_) => false,
            }
        })
    }

    pub fn size(&self) -> usize {
        self.queue.size()
    }

    pub fn empty(&self) -> bool {
        self.queue.empty()
    }

    /// Copy of the head job.
    pub fn front(&self) -> Result<JobRecord, QueueError> {
        self.queue.front_cloned()
    }

    /// Copy of the tail job.
    pub fn back(&self) -> Result<JobRecord, QueueError> {
        self.queue.back_cloned()
    }

    /// Consistent head-to-tail copy of the queue.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.queue.snapshot()
    }

    /// Identifiers in queue order.
    pub fn ids(&self) -> Vec<JobId> {
        self.queue
            .with_lock(|chain, _| chain.iter().map(|job| job.id.clone()).collect())
    }

    /// Number of enqueued jobs per status.
    pub fn status_counts(&self) -> BTreeMap<JobStatus, usize> {
        self.queue.with_lock(|chain, _| {
            let mut counts = BTreeMap::new();
            for job in chain.iter() {
                *counts.entry(job.status).or_insert(0) += 1;
            }
            counts
        })
    }

    /// Verify the chain invariants and that the index mirrors the chain exactly.
    pub fn check_consistency(&self) -> Result<(), QueueError> {
        self.queue.with_lock(|chain, index| {
            chain.check_invariants()?;
            if index.len() != chain.len() {
                return Err(QueueError::Corrupted(format!(
                    "index has {} entries for {} jobs",
                    index.len(),
                    chain.len()
                )));
            }
            for (id, handle) in index.iter() {
                let job = chain.get(*handle).map_err(|err| {
                    QueueError::Corrupted(format!("index entry {id} is stale: {err}"))
                })?;
                if &job.id != id {
                    return Err(QueueError::Corrupted(format!(
                        "index entry {id} resolves to job {}",
                        job.id
                    )));
                }
            }
            Ok(())
        })
    }
}

impl QueueHook for JobQueue {
    fn kind(&self) -> &'static str {
        "job"
    }

    /// Log a per-status census of the queue.
    fn special_operation(&self) {
        let counts = self.status_counts();
        let census = counts
            .iter()
            .map(|(status, count)| format!("{status}={count}"))
            .collect::<Vec<_>>()
            .join(" ");
        tracing::info!(
            queue = %self.config.name,
            kind = self.kind(),
            size = self.size(),
            "Job census: {}",
            census
        );
    }
}
