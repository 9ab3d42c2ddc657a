//! Job handler trait.

use std::future::Future;
use std::pin::Pin;

use queue_core::{JobRecord, JobStatus};

/// Result type for job handlers.
///
/// `Ok(Some(status))` resubmits the job with `status`; `Ok(None)` means the
/// job is finished and leaves the system.
pub type HandlerResult = Result<Option<JobStatus>, String>;

/// Future type for async job handlers.
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Trait for job handlers.
///
/// Implement this trait to drive the execution of dispatched jobs.
pub trait JobHandler: Send + Sync + 'static {
    /// Process a job and report what should happen to it next.
    fn handle(&self, job: &JobRecord) -> HandlerFuture;
}

/// A simple function-based job handler.
pub struct FnHandler<F>
where
    F: Fn(&JobRecord) -> HandlerFuture + Send + Sync + 'static,
{
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&JobRecord) -> HandlerFuture + Send + Sync + 'static,
{
    /// Create a new function-based handler.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> JobHandler for FnHandler<F>
where
    F: Fn(&JobRecord) -> HandlerFuture + Send + Sync + 'static,
{
    fn handle(&self, job: &JobRecord) -> HandlerFuture {
        (self.handler)(job)
    }
}
