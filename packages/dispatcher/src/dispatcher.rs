//! Polling loop that drains a job queue into a handler.

use std::sync::Arc;
use std::time::Duration;

use queue_core::{JobId, JobQueue, QueueError};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::config::DispatcherConfig;
use crate::handler::JobHandler;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("invalid dispatcher config: {0}")]
    Config(String),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Counters for one dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    /// Jobs handed to the handler.
    pub dispatched: u64,
    /// Jobs put back into the queue with a new status.
    pub resubmitted: u64,
    /// Jobs the handler finished.
    pub finished: u64,
    /// Jobs whose handler returned an error.
    pub failed: u64,
    /// Jobs the queue refused to take back, e.g. because the id was reused
    /// while the job was in flight.
    pub rejected: u64,
}

/// Consumer of a shared [`JobQueue`].
pub struct Dispatcher {
    queue: Arc<JobQueue>,
    handler: Arc<dyn JobHandler>,
    config: DispatcherConfig,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(queue: Arc<JobQueue>, handler: impl JobHandler, config: DispatcherConfig) -> Self {
        Self {
            queue,
            handler: Arc::new(handler),
            config,
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> &DispatchStats {
        &self.stats
    }

    /// Make one `dequeue` attempt and drive the job it yields, if any.
    ///
    /// Returns the id of the handled job, or `None` if nothing was dispatchable
    /// on this attempt.
    pub async fn run_once(&mut self) -> Result<Option<JobId>, DispatchError> {
        let Some(mut job) = self.queue.dequeue() else {
            return Ok(None);
        };
        let job_id = job.id.clone();
        self.stats.dispatched += 1;
        tracing::debug!(worker = %self.config.worker_id, job_id = %job_id, status = %job.status, "Dispatching job");

        match self.handler.handle(&job).await {
            Ok(Some(next)) => {
                job.set_status(next);
                match self.queue.enqueue(job) {
                    Ok(()) => {
                        self.stats.resubmitted += 1;
                        tracing::debug!(worker = %self.config.worker_id, job_id = %job_id, status = %next, "Resubmitted job");
                    }
                    Err(e) => {
                        self.stats.rejected += 1;
                        tracing::warn!(worker = %self.config.worker_id, job_id = %job_id, status = %next, "Resubmit rejected: {}", e);
                    }
                }
            }
            Ok(None) => {
                self.stats.finished += 1;
                tracing::info!(worker = %self.config.worker_id, job_id = %job_id, "Job finished");
            }
            Err(e) => {
                self.stats.failed += 1;
                tracing::warn!(worker = %self.config.worker_id, job_id = %job_id, "Job failed: {}", e);
            }
        }
        Ok(Some(job_id))
    }

    /// Give every job currently in the queue one chance to be dispatched.
    pub async fn run_pass(&mut self) -> Result<usize, DispatchError> {
        let attempts = self.queue.size();
        let mut handled = 0;
        for _ in 0..attempts {
            if self.queue.empty() {
                break;
            }
            if self.run_once().await?.is_some() {
                handled += 1;
            }
        }
        Ok(handled)
    }

    /// Poll until `shutdown` becomes true or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<DispatchStats, DispatchError> {
        tracing::info!(
            worker = %self.config.worker_id,
            queue = %self.queue.config().name,
            poll_interval_ms = self.config.poll_interval_ms,
            "Starting dispatcher"
        );
        let mut interval = tokio::time::interval(Duration::from_millis(self.config.poll_interval_ms));

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = interval.tick() => {
                    self.run_pass().await?;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            worker = %self.config.worker_id,
            dispatched = self.stats.dispatched,
            finished = self.stats.finished,
            failed = self.stats.failed,
            rejected = self.stats.rejected,
            "Stopping dispatcher"
        );
        Ok(self.stats)
    }
}
