#![allow(clippy::disallowed_methods)]

use std::error::Error;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use dispatcher::{DispatchStats, Dispatcher, DispatcherConfig, FnHandler, HandlerFuture};
use queue_core::{JobId, JobQueue, JobRecord, JobStatus};

fn finish_immediately(_job: &JobRecord) -> HandlerFuture {
    Box::pin(async { Ok(None) })
}

fn retry_once(job: &JobRecord) -> HandlerFuture {
    let status = job.status;
    Box::pin(async move {
        match status {
            JobStatus::Queuing => Ok(Some(JobStatus::Retry)),
            _ => Ok(None),
        }
    })
}

fn always_fail(_job: &JobRecord) -> HandlerFuture {
    Box::pin(async { Err("boom".to_string()) })
}

#[tokio::test]
async fn run_once_skips_parked_jobs() -> Result<(), Box<dyn Error>> {
    let queue = Arc::new(JobQueue::default());
    queue.enqueue(JobRecord::new("parked", JobStatus::Suspending))?;
    queue.enqueue(JobRecord::new("ready", JobStatus::Queuing))?;

    let mut dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        FnHandler::new(finish_immediately),
        DispatcherConfig::default(),
    );

    assert_eq!(dispatcher.run_once().await?, None);
    assert_eq!(dispatcher.run_once().await?, Some(JobId::from("ready")));
    assert_eq!(queue.ids(), vec![JobId::from("parked")]);
    assert_eq!(dispatcher.stats().finished, 1);
    Ok(())
}

#[tokio::test]
async fn resubmitted_job_comes_back_with_new_status() -> Result<(), Box<dyn Error>> {
    let queue = Arc::new(JobQueue::default());
    queue.enqueue(JobRecord::new("a", JobStatus::Queuing))?;

    let mut dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        FnHandler::new(retry_once),
        DispatcherConfig::default(),
    );

    dispatcher.run_once().await?;
    assert_eq!(queue.get("a").map(|job| job.status), Some(JobStatus::Retry));
    dispatcher.run_once().await?;
    assert!(queue.empty());
    assert_eq!(
        *dispatcher.stats(),
        DispatchStats {
            dispatched: 2,
            resubmitted: 1,
            finished: 1,
            failed: 0,
            rejected: 0,
        }
    );
    Ok(())
}

#[tokio::test]
async fn handler_errors_are_counted_not_propagated() -> Result<(), Box<dyn Error>> {
    let queue = Arc::new(JobQueue::default());
    queue.enqueue(JobRecord::new("x", JobStatus::Resume))?;

    let mut dispatcher = Dispatcher::new(
        Arc::clone(&queue),
        FnHandler::new(always_fail),
        DispatcherConfig::default(),
    );
    assert_eq!(dispatcher.run_pass().await?, 1);
    assert_eq!(dispatcher.stats().failed, 1);
    assert!(queue.empty());
    Ok(())
}

#[tokio::test]
async fn run_drains_queue_until_shutdown() -> Result<(), Box<dyn Error>> {
    let queue = Arc::new(JobQueue::default());
    for i in 0..10 {
        queue.enqueue(JobRecord::new(format!("job-{i}"), JobStatus::Queuing))?;
    }
    queue.enqueue(JobRecord::new("parked", JobStatus::Cancelled))?;

    let handled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&handled);
    let handler = FnHandler::new(move |_job: &JobRecord| -> HandlerFuture {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async { Ok(None) })
    });

    let (tx, rx) = tokio::sync::watch::channel(false);
    let config = DispatcherConfig::default().with_poll_interval_ms(5);
    let task = tokio::spawn(Dispatcher::new(Arc::clone(&queue), handler, config).run(rx));

    for _ in 0..200 {
        if queue.size() == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    tx.send(true)?;
    let stats = task.await??;

    assert_eq!(handled.load(Ordering::SeqCst), 10);
    assert_eq!(stats.finished, 10);
    assert_eq!(queue.ids(), vec![JobId::from("parked")]);
    Ok(())
}

#[tokio::test]
async fn rejected_resubmit_is_counted_and_pass_continues() -> Result<(), Box<dyn Error>> {
    let queue = Arc::new(JobQueue::default());
    queue.enqueue(JobRecord::new("a", JobStatus::Queuing))?;
    queue.enqueue(JobRecord::new("b", JobStatus::Queuing))?;

    // While "a" is in flight a producer reuses its id.
    let producer = Arc::clone(&queue);
    let reused = Arc::new(AtomicBool::new(false));
    let handler = FnHandler::new(move |job: &JobRecord| -> HandlerFuture {
        if job.id.as_str() == "a" && !reused.swap(true, Ordering::SeqCst) {
            let _ = producer.enqueue(JobRecord::new("a", JobStatus::Queuing));
            return Box::pin(async { Ok(Some(JobStatus::Retry)) });
        }
        Box::pin(async { Ok(None) })
    });

    let mut dispatcher = Dispatcher::new(Arc::clone(&queue), handler, DispatcherConfig::default());
    assert_eq!(dispatcher.run_pass().await?, 2);
    assert_eq!(
        *dispatcher.stats(),
        DispatchStats {
            dispatched: 2,
            resubmitted: 0,
            finished: 1,
            failed: 0,
            rejected: 1,
        }
    );
    assert_eq!(queue.ids(), vec![JobId::from("a")]);
    assert_eq!(queue.get("a").map(|job| job.status), Some(JobStatus::Queuing));
    Ok(())
}
