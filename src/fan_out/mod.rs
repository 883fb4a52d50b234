//! Bounded-concurrency fan-out over keyed operations.
//!
//! A batch is a list of [`FanOutTask`]s, each a unique key paired with an
//! operation. [`FanOutExecutor::run`] keeps at most `max_parallel` of them
//! running, starts the next one whenever a slot frees up, and returns a
//! [`FanOutResults`] with one outcome per key once every task has finished.
//!
//! Failures are partial by nature: one key failing never cancels another.
//! Wrap operations with [`FanOutTask::retrying`] to give each key its own
//! retry session.
//!
//! # Example
//!
//! ```rust
//! use breakwater::{classify, FanOutExecutor, FanOutTask, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::exponential(Duration::from_millis(1))
//!     .with_max_attempts(3)
//!     .with_timeout(Duration::from_secs(2));
//! let retry = RetryExecutor::new();
//!
//! let tasks = [11u64, 12, 13].map(|chat_id| {
//!     FanOutTask::retrying(chat_id, retry.clone(), policy.clone(), classify::Always, move || async move {
//!         Ok::<_, String>(format!("marked {chat_id} as read"))
//!     })
//! });
//!
//! let results = FanOutExecutor::new().run(tasks, 20).await?;
//! assert_eq!(results.success_count(), 3);
//! # Ok::<_, breakwater::FanOutError>(())
//! # }).unwrap();
//! ```

mod error;
mod executor;
mod results;
mod task;

pub use error::FanOutError;
pub use executor::FanOutExecutor;
pub use results::{FanOutResults, TaskFailure};
pub use task::FanOutTask;
