//! Retry with exponential backoff and per-attempt timeouts.
//!
//! - **Pure policy**: [`RetryPolicy`] is just data: attempt limit, base
//!   delay, optional timeout. Its backoff schedule is inspectable without
//!   running anything.
//! - **Caller-owned classification**: every call supplies a
//!   [`FailureClassifier`](crate::FailureClassifier) deciding which failures
//!   are transient.
//! - **Absorbed failures**: intermediate failures are reported as events and
//!   never returned; the caller gets one [`ExecutionResult`].
//!
//! # Quick Start
//!
//! ```rust
//! use breakwater::{classify, AttemptError, ExecutionResult, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let policy = RetryPolicy::exponential(Duration::from_millis(1))
//!     .with_max_attempts(3)
//!     .with_timeout(Duration::from_secs(30));
//!
//! let result = RetryExecutor::new()
//!     .execute(&policy, classify::Always, || async { Err::<(), _>("HTTP 503") })
//!     .await;
//!
//! assert_eq!(
//!     result,
//!     ExecutionResult::Failed {
//!         error: AttemptError::Operation("HTTP 503"),
//!         attempts: 3,
//!     }
//! );
//! # });
//! ```
//!
//! # Backoff
//!
//! The delay before attempt `n` is `base_delay * 2^(n-2)`: with a one second
//! base, a three-attempt policy waits 1s then 2s. Optional
//! [`with_max_delay`](RetryPolicy::with_max_delay) caps the delay, and the
//! `jitter` feature enables randomized delays:
//!
//! ```toml
//! breakwater = { version = "...", features = ["jitter"] }
//! ```
//!
//! # Error Types
//!
//! - [`AttemptError`]: why one attempt failed (operation error or timeout)
//! - [`RetryError`]: why a whole session failed, as a plain error value
//! - [`PolicyError`]: a policy broke its invariants

mod error;
mod executor;
mod outcome;
mod policy;

pub use error::{AttemptError, PolicyError, RetryError};
pub use executor::{with_timeout, RetryExecutor};
pub use outcome::{AttemptOutcome, ExecutionResult};
pub use policy::{JitterStrategy, RetryPolicy};
