//! # Breakwater
//!
//! Resilient execution for unreliable remote calls.
//!
//! Remote APIs rate-limit, time out and return the odd 502. Breakwater gives
//! callers two building blocks for living with that:
//!
//! - [`RetryExecutor`]: run one operation under a [`RetryPolicy`] with
//!   exponential backoff, an optional per-attempt timeout and a
//!   caller-supplied [`FailureClassifier`].
//! - [`FanOutExecutor`]: run many keyed operations with a concurrency cap,
//!   recording a per-key outcome instead of failing the batch.
//!
//! Both report what they do as [`Event`]s; by default those become `tracing`
//! events under the `breakwater::retry` and `breakwater::fan_out` targets.
//!
//! ## Quick Example
//!
//! ```rust
//! use breakwater::classify::{self, FailureKind};
//! use breakwater::{AttemptError, FanOutExecutor, FanOutTask, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! #[derive(Debug)]
//! struct HttpError(u16);
//!
//! fn transient(err: &AttemptError<HttpError>, _attempt: u32) -> bool {
//!     match err {
//!         AttemptError::TimedOut { .. } => true,
//!         AttemptError::Operation(HttpError(status)) => {
//!             classify::status_code(*status) == FailureKind::Transient
//!         }
//!     }
//! }
//!
//! async fn mark_as_read(chat_id: i64) -> Result<(), HttpError> {
//!     if chat_id < 0 { Err(HttpError(403)) } else { Ok(()) }
//! }
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::exponential(Duration::from_millis(1))
//!     .with_max_attempts(3)
//!     .with_timeout(Duration::from_secs(2));
//! let retry = RetryExecutor::new();
//!
//! let tasks = [1_i64, 2, -3].map(|chat_id| {
//!     FanOutTask::retrying(chat_id, retry.clone(), policy.clone(), transient, move || {
//!         mark_as_read(chat_id)
//!     })
//! });
//!
//! let results = FanOutExecutor::new().run(tasks, 20).await.unwrap();
//! assert_eq!(results.success_count(), 2);
//! assert_eq!(results.failed_keys().collect::<Vec<_>>(), vec![&-3]);
//! # });
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod classify;
pub mod config;
pub mod event;
pub mod fan_out;
pub mod retry;
pub mod testing;

// Re-exports
pub use classify::FailureClassifier;
pub use config::{ExecutorConfig, FanOutConfig, RetryConfig};
pub use event::{Event, EventSink, NoopSink, Outcome, TracingSink};
pub use fan_out::{FanOutError, FanOutExecutor, FanOutResults, FanOutTask, TaskFailure};
pub use retry::{
    with_timeout, AttemptError, AttemptOutcome, ExecutionResult, JitterStrategy, PolicyError,
    RetryError, RetryExecutor, RetryPolicy,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::classify::{Classify, FailureClassifier, FailureKind};
    pub use crate::event::{Event, EventSink};
    pub use crate::fan_out::{FanOutExecutor, FanOutResults, FanOutTask, TaskFailure};
    pub use crate::retry::{AttemptError, ExecutionResult, RetryExecutor, RetryPolicy};
}
