use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use dispatcher::{Dispatcher, DispatcherConfig, FnHandler, HandlerFuture};
use queue_core::{JobQueue, JobQueueConfig, JobRecord, JobStatus, run_maintenance};
use tape_queue::{OperationKind, TapeDriveQueue};
use tracing_subscriber::EnvFilter;

/// Moves a job one step through its lifecycle; finished once it has run.
fn advance(job: &JobRecord) -> HandlerFuture {
    let status = job.status;
    Box::pin(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        match status {
            JobStatus::Queuing => Ok(Some(JobStatus::Retry)),
            JobStatus::Retry | JobStatus::Resume => Ok(None),
            other => Err(format!("unexpected status {other}")),
        }
    })
}

/// Enqueue three jobs and walk the status protocol by hand.
fn walk_protocol(queue: &JobQueue) -> Result<(), Box<dyn Error>> {
    queue.enqueue(JobRecord::new("1", JobStatus::Queuing))?;
    queue.enqueue(JobRecord::new("2", JobStatus::Suspending))?;
    queue.enqueue(JobRecord::new("3", JobStatus::Retry))?;

    while !queue.empty() {
        if let Some(job) = queue.dequeue() {
            tracing::info!(job_id = %job.id, status = %job.status, "Dequeued job");
            continue;
        }
        // Only parked jobs left: nothing will ever dispatch them.
        if queue.snapshot().iter().all(|job| job.status.is_requeued()) {
            for id in queue.ids() {
                if let Some(job) = queue.dequeue_by_job_id(id.as_str()) {
                    tracing::info!(job_id = %job.id, status = %job.status, "Removed parked job by id");
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let queue_config = JobQueueConfig::from_env()?;
    let dispatcher_config = DispatcherConfig::from_env()?;

    let scenario = JobQueue::new(queue_config.clone().with_name("scenario"));
    walk_protocol(&scenario)?;

    let queue = Arc::new(JobQueue::new(queue_config));
    queue.subscribe(|event| tracing::debug!(target: "queue_events", "{}", event.description()));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let dispatcher = Dispatcher::new(Arc::clone(&queue), FnHandler::new(advance), dispatcher_config);
    let worker = tokio::spawn(dispatcher.run(shutdown_rx));

    let producer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            for i in 0..20 {
                let status = if i % 5 == 0 {
                    JobStatus::Suspending
                } else {
                    JobStatus::Queuing
                };
                if let Err(e) = queue.enqueue(JobRecord::new(format!("job-{i}"), status)) {
                    tracing::warn!("Producer enqueue failed: {}", e);
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
    };
    producer.await?;

    tokio::time::sleep(Duration::from_millis(500)).await;
    for id in queue.ids() {
        queue.update_status(id.as_str(), JobStatus::Resume);
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    shutdown_tx.send(true)?;
    let stats = worker.await??;

    let drive = TapeDriveQueue::new("drive-0");
    drive.push(OperationKind::LoadTape);
    drive.push(OperationKind::ReadAggr);
    drive.push(OperationKind::UnloadTape);
    run_maintenance(&[&*queue, &drive]);
    while let Some(op) = drive.take_next() {
        tracing::info!(drive = drive.drive(), kind = %op.kind(), "Ran tape operation");
    }

    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
