//! Configuration for the job queue.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid job queue config: {0}")]
    Invalid(String),
}

/// What `dequeue` does with a job whose status has no dispatch rule
/// (`Starting`, `Indexing`, `Running`, `Succeed`, `Failed`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedStatusPolicy {
    /// Drop the job from the chain and from the identifier index.
    #[default]
    Discard,
    /// Put the job back at the tail, like a suspended job.
    Requeue,
}

impl UnmatchedStatusPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            UnmatchedStatusPolicy::Discard => "discard",
            UnmatchedStatusPolicy::Requeue => "requeue",
        }
    }
}

impl fmt::Display for UnmatchedStatusPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnmatchedStatusPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discard" | "drop" => Ok(UnmatchedStatusPolicy::Discard),
            "requeue" => Ok(UnmatchedStatusPolicy::Requeue),
            other => Err(ConfigError::Invalid(format!(
                "unsupported unmatched status policy {other} (expected discard|requeue)"
            ))),
        }
    }
}

/// Configuration for job queue behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobQueueConfig {
    /// Human-readable name used in log fields.
    pub name: String,
    /// Handling of jobs whose status neither dispatches nor requeues.
    pub unmatched_status: UnmatchedStatusPolicy,
}

impl Default for JobQueueConfig {
    fn default() -> Self {
        Self {
            name: "jobs".to_string(),
            unmatched_status: UnmatchedStatusPolicy::default(),
        }
    }
}

impl JobQueueConfig {
    /// Set the queue name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the unmatched status policy.
    pub fn with_unmatched_status(mut self, policy: UnmatchedStatusPolicy) -> Self {
        self.unmatched_status = policy;
        self
    }

    /// Build a config from environment variables.
    ///
    /// - `JOB_QUEUE_NAME` (default: `jobs`)
    /// - `JOB_QUEUE_UNMATCHED_STATUS` (`discard`/`requeue`, default: `discard`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let name = lookup("JOB_QUEUE_NAME")
            .and_then(non_empty)
            .unwrap_or(defaults.name);
        let unmatched_status = match lookup("JOB_QUEUE_UNMATCHED_STATUS").and_then(non_empty) {
            Some(raw) => raw.parse()?,
            None => defaults.unmatched_status,
        };
        Ok(Self {
            name,
            unmatched_status,
        })
    }
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_environment_is_empty() -> Result<(), ConfigError> {
        let config = JobQueueConfig::from_lookup(lookup_from(&[]))?;
        assert_eq!(config, JobQueueConfig::default());
        Ok(())
    }

    #[test]
    fn reads_name_and_policy() -> Result<(), ConfigError> {
        let config = JobQueueConfig::from_lookup(lookup_from(&[
            ("JOB_QUEUE_NAME", " indexer "),
            ("JOB_QUEUE_UNMATCHED_STATUS", "Requeue"),
        ]))?;
        assert_eq!(config.name, "indexer");
        assert_eq!(config.unmatched_status, UnmatchedStatusPolicy::Requeue);
        Ok(())
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = JobQueueConfig::from_lookup(lookup_from(&[(
            "JOB_QUEUE_UNMATCHED_STATUS",
            "explode",
        )]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn deserializes_partial_json() -> Result<(), serde_json::Error> {
        let config: JobQueueConfig = serde_json::from_str(r#"{"unmatched_status":"requeue"}"#)?;
        assert_eq!(config.name, "jobs");
        assert_eq!(config.unmatched_status, UnmatchedStatusPolicy::Requeue);
        Ok(())
    }
}
