//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::dispatcher::DispatchError;

/// Configuration for the polling loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Delay between polls of the queue, in milliseconds.
    pub poll_interval_ms: u64,
    /// Name reported in log fields.
    pub worker_id: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            worker_id: "dispatcher-0".to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Set the poll interval.
    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Set the worker id.
    pub fn with_worker_id(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = worker_id.into();
        self
    }

    /// Build a config from environment variables.
    ///
    /// - `DISPATCHER_POLL_INTERVAL_MS` (default: `100`, must be positive)
    /// - `DISPATCHER_WORKER_ID` (default: `dispatcher-0`)
    pub fn from_env() -> Result<Self, DispatchError> {
        let defaults = Self::default();
        let poll_interval_ms = match std::env::var("DISPATCHER_POLL_INTERVAL_MS") {
            Ok(raw) => parse_interval(&raw)?,
            Err(std::env::VarError::NotPresent) => defaults.poll_interval_ms,
            Err(e) => {
                return Err(DispatchError::Config(format!(
                    "failed reading DISPATCHER_POLL_INTERVAL_MS: {e}"
                )));
            }
        };
        let worker_id = std::env::var("DISPATCHER_WORKER_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.worker_id);
        Ok(Self {
            poll_interval_ms,
            worker_id,
        })
    }
}

fn parse_interval(raw: &str) -> Result<u64, DispatchError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(DispatchError::Config(format!(
            "invalid DISPATCHER_POLL_INTERVAL_MS={raw} (expected a positive integer)"
        ))),
        Ok(ms) => Ok(ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_must_be_positive() {
        assert!(matches!(parse_interval(" 250 "), Ok(250)));
        assert!(parse_interval("0").is_err());
        assert!(parse_interval("fast").is_err());
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = DispatcherConfig::default()
            .with_poll_interval_ms(5)
            .with_worker_id("w-1");
        assert_eq!(config.poll_interval_ms, 5);
        assert_eq!(config.worker_id, "w-1");
    }
}
