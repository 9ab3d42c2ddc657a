#![allow(clippy::disallowed_methods)]

mod common;

use std::collections::HashSet;
use std::error::Error;
use std::sync::Arc;
use std::thread;

use queue_core::{JobId, JobQueue, JobRecord, JobStatus};

#[test]
fn status_protocol_scenario() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue_with(&[
        ("1", JobStatus::Queuing),
        ("2", JobStatus::Suspending),
        ("3", JobStatus::Retry),
    ])?;

    let first = queue.dequeue().ok_or("expected job 1")?;
    assert_eq!(first.id, JobId::from("1"));
    assert_eq!(first.status, JobStatus::Queuing);
    assert_eq!(queue.ids(), vec![JobId::from("2"), JobId::from("3")]);
    assert_eq!(queue.size(), 2);

    assert_eq!(queue.dequeue(), None);
    assert_eq!(queue.ids(), vec![JobId::from("3"), JobId::from("2")]);
    assert_eq!(queue.size(), 2);

    let third = queue.dequeue().ok_or("expected job 3")?;
    assert_eq!(third.id, JobId::from("3"));
    assert_eq!(queue.ids(), vec![JobId::from("2")]);
    assert_eq!(queue.size(), 1);

    let second = queue.dequeue_by_job_id("2").ok_or("expected job 2")?;
    assert_eq!(second.id, JobId::from("2"));
    assert_eq!(queue.size(), 0);
    queue.check_consistency()?;
    Ok(())
}

#[test]
fn empty_queue_dequeues_nothing() {
    let queue = JobQueue::default();
    assert_eq!(queue.dequeue(), None);
    assert_eq!(queue.dequeue_by_job_id("nope"), None);
    assert!(queue.front().is_err_and(|e| e.is_underflow()));
    assert!(queue.back().is_err_and(|e| e.is_underflow()));
}

#[test]
fn missing_identifier_leaves_size_unchanged() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue_with(&[("a", JobStatus::Queuing), ("b", JobStatus::Running)])?;
    assert_eq!(queue.dequeue_by_job_id("c"), None);
    assert_eq!(queue.dequeue_by_job_id("c"), None);
    assert_eq!(queue.size(), 2);
    Ok(())
}

#[test]
fn enqueue_then_remove_round_trips() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue_with(&[("a", JobStatus::Queuing), ("c", JobStatus::Retry)])?;
    let before = queue.size();

    let job = JobRecord::new("b", JobStatus::Indexing);
    queue.enqueue(job.clone())?;
    assert_eq!(queue.size(), before + 1);

    assert_eq!(queue.dequeue_by_job_id("b"), Some(job));
    assert_eq!(queue.size(), before);
    queue.check_consistency()?;
    Ok(())
}

#[test]
fn removal_from_the_middle_keeps_order() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue_with(&[
        ("1", JobStatus::Queuing),
        ("2", JobStatus::Queuing),
        ("3", JobStatus::Queuing),
    ])?;
    queue.dequeue_by_job_id("2").ok_or("expected job 2")?;
    assert_eq!(queue.front()?.id, JobId::from("1"));
    assert_eq!(queue.back()?.id, JobId::from("3"));
    queue.check_consistency()?;
    Ok(())
}

#[test]
fn index_resolves_every_enqueued_job() -> Result<(), Box<dyn Error>> {
    let queue = JobQueue::default();
    for i in 0..50 {
        let status = match i % 4 {
            0 => JobStatus::Queuing,
            1 => JobStatus::Suspending,
            2 => JobStatus::Retry,
            _ => JobStatus::Cancelled,
        };
        queue.enqueue(JobRecord::new(i.to_string(), status))?;
    }
    for _ in 0..30 {
        queue.dequeue();
    }

    for id in queue.ids() {
        let resolved = queue.get(id.as_str()).ok_or("indexed job missing")?;
        assert_eq!(resolved.id, id);
    }
    queue.check_consistency()?;
    Ok(())
}

#[test]
fn dispatcher_resubmits_with_new_status() -> Result<(), Box<dyn Error>> {
    let queue = common::job_queue_with(&[("job", JobStatus::Queuing)])?;
    let mut job = queue.dequeue().ok_or("expected job")?;

    job.set_status(JobStatus::Running);
    job.set_status(JobStatus::Suspending);
    queue.enqueue(job)?;
    assert_eq!(queue.dequeue(), None);

    assert!(queue.update_status("job", JobStatus::Resume));
    let resumed = queue.dequeue().ok_or("expected resumed job")?;
    assert_eq!(resumed.status, JobStatus::Resume);
    assert!(queue.empty());
    Ok(())
}

#[test]
fn concurrent_enqueue_dequeue_and_removal_stay_consistent() -> Result<(), Box<dyn Error>> {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 200;

    let queue = Arc::new(JobQueue::default());

    let taken: Vec<JobId> = thread::scope(|scope| {
        for producer in 0..PRODUCERS {
            let queue = Arc::clone(&queue);
            scope.spawn(move || {
                for i in 0..PER_PRODUCER {
                    let status = if i % 3 == 0 {
                        JobStatus::Suspending
                    } else {
                        JobStatus::Queuing
                    };
                    let _ = queue.enqueue(JobRecord::new(format!("{producer}-{i}"), status));
                }
            });
        }

        let dispatcher = {
            let queue = Arc::clone(&queue);
            scope.spawn(move || {
                let mut taken = Vec::new();
                for _ in 0..PER_PRODUCER {
                    if let Some(job) = queue.dequeue() {
                        taken.push(job.id);
                    }
                }
                taken
            })
        };

        let remover = {
            let queue = Arc::clone(&queue);
            scope.spawn(move || {
                let mut taken = Vec::new();
                for i in (0..PER_PRODUCER).step_by(3) {
                    if let Some(job) = queue.dequeue_by_job_id(&format!("0-{i}")) {
                        taken.push(job.id);
                    }
                }
                taken
            })
        };

        let mut taken = dispatcher.join().unwrap_or_default();
        taken.extend(remover.join().unwrap_or_default());
        taken
    });

    let unique: HashSet<_> = taken.iter().cloned().collect();
    assert_eq!(unique.len(), taken.len());
    for id in &taken {
        assert!(!queue.contains(id.as_str()));
    }
    assert_eq!(taken.len() + queue.size(), PRODUCERS * PER_PRODUCER);
    queue.check_consistency()?;
    Ok(())
}
