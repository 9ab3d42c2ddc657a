//! Polling dispatcher for a shared [`queue_core::JobQueue`].
//!
//! The queue never blocks waiting for work, so the dispatcher polls it on a
//! fixed interval, hands each dispatchable job to a [`JobHandler`] and
//! resubmits jobs the handler reports as still pending.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use dispatcher::{Dispatcher, DispatcherConfig, FnHandler};
//!
//! let queue = Arc::new(queue_core::JobQueue::default());
//! let handler = FnHandler::new(|_job| Box::pin(async { Ok(None) }));
//! let (tx, rx) = tokio::sync::watch::channel(false);
//! let task = tokio::spawn(Dispatcher::new(queue, handler, DispatcherConfig::default()).run(rx));
//! ```

mod config;
mod dispatcher;
mod handler;

pub use config::DispatcherConfig;
pub use dispatcher::{DispatchError, DispatchStats, Dispatcher};
pub use handler::{FnHandler, HandlerFuture, HandlerResult, JobHandler};
