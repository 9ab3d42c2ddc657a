//! Job domain types for work items in the queue.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Caller-assigned identifier of a job.
///
/// Identifiers must be unique among the jobs currently enqueued in one queue.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for JobId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for JobId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Current status of a job in its lifecycle.
///
/// Status is owned by the producer/dispatcher; the queue only reads it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Starting = 1,
    Indexing = 2,
    Queuing = 3,
    Running = 4,
    Suspending = 5,
    Succeed = 6,
    Failed = 7,
    /// Cancelled by the user.
    Cancelled = 8,
    Retry = 9,
    Resume = 10,
}

impl JobStatus {
    pub const ALL: [JobStatus; 10] = [
        JobStatus::Starting,
        JobStatus::Indexing,
        JobStatus::Queuing,
        JobStatus::Running,
        JobStatus::Suspending,
        JobStatus::Succeed,
        JobStatus::Failed,
        JobStatus::Cancelled,
        JobStatus::Retry,
        JobStatus::Resume,
    ];

    /// Statuses that send a popped job back to the tail.
    pub fn is_requeued(self) -> bool {
        matches!(self, JobStatus::Suspending | JobStatus::Cancelled)
    }

    /// Statuses that are handed to the caller of `dequeue`.
    pub fn is_dispatchable(self) -> bool {
        matches!(self, JobStatus::Queuing | JobStatus::Retry | JobStatus::Resume)
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// Get a simple status string for display.
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Starting => "starting",
            JobStatus::Indexing => "indexing",
            JobStatus::Queuing => "queuing",
            JobStatus::Running => "running",
            JobStatus::Suspending => "suspending",
            JobStatus::Succeed => "succeed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
            JobStatus::Retry => "retry",
            JobStatus::Resume => "resume",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown job status: {s}"))
    }
}

impl TryFrom<i32> for JobStatus {
    type Error = String;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        JobStatus::ALL
            .into_iter()
            .find(|status| *status as i32 == code)
            .ok_or_else(|| format!("unknown job status code: {code}"))
    }
}

/// A job as seen by the queue: an identifier and a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier for this job.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    pub fn new(id: impl Into<JobId>, status: JobStatus) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Returns this record if it carries `job_id`.
    pub fn matches_id(&self, job_id: &str) -> Option<&JobRecord> {
        (self.id.as_str() == job_id).then_some(self)
    }

    /// Change the status and bump `updated_at`.
    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
