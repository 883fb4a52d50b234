//! The retry loop.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::classify::FailureClassifier;
use crate::event::{Event, EventSink, Outcome, TracingSink};
use crate::retry::error::AttemptError;
use crate::retry::outcome::{AttemptOutcome, ExecutionResult};
use crate::retry::policy::RetryPolicy;

/// Runs one asynchronous operation under a [`RetryPolicy`].
///
/// The executor holds no per-call state: the policy and classifier are passed
/// to every [`execute`](Self::execute) call, so one executor can be cloned
/// into many tasks.
///
/// # Example
///
/// ```rust
/// use breakwater::{classify, RetryExecutor, RetryPolicy};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let calls = AtomicU32::new(0);
/// let counter = &calls;
/// let policy = RetryPolicy::exponential(Duration::from_millis(1)).with_max_attempts(3);
///
/// let result = RetryExecutor::new()
///     .execute(&policy, classify::Always, move || async move {
///         if counter.fetch_add(1, Ordering::SeqCst) == 0 {
///             Err("flaky")
///         } else {
///             Ok("delivered")
///         }
///     })
///     .await;
///
/// assert_eq!(result.into_result(), Ok("delivered"));
/// assert_eq!(calls.load(Ordering::SeqCst), 2);
/// # });
/// ```
#[derive(Clone)]
pub struct RetryExecutor {
    sink: Arc<dyn EventSink>,
    cancel: Option<CancellationToken>,
}

impl RetryExecutor {
    /// An executor that logs through [`TracingSink`] and is never cancelled
    /// except by dropping the `execute` future.
    pub fn new() -> Self {
        Self {
            sink: Arc::new(TracingSink),
            cancel: None,
        }
    }

    /// Report events to `sink` instead of `tracing`.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Report events to a shared sink.
    pub fn with_shared_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Stop sessions when `token` is cancelled.
    ///
    /// Cancellation interrupts the running attempt or the backoff sleep and
    /// ends the session with [`ExecutionResult::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run `operation` until it succeeds, the classifier rejects a failure,
    /// or the policy runs out of attempts.
    ///
    /// Attempts are strictly sequential. Between attempt `n` and `n + 1` the
    /// executor sleeps `base_delay * 2^(n-1)`. With
    /// `max_attempts == 1` the classifier is still consulted, but its verdict
    /// only shows up in the `attempt_outcome` event.
    pub async fn execute<T, E, C, F, Fut>(
        &self,
        policy: &RetryPolicy,
        classifier: C,
        mut operation: F,
    ) -> ExecutionResult<T, E>
    where
        C: FailureClassifier<E>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let max_attempts = policy.max_attempts();
        let mut attempt = 1u32;

        loop {
            if self.is_cancelled() {
                return ExecutionResult::Cancelled {
                    attempts: attempt - 1,
                };
            }
            self.sink.record(&Event::AttemptStart {
                attempt,
                max_attempts,
            });

            let attempt_future = run_attempt(policy.per_attempt_timeout(), operation());
            let Some(outcome) = self.until_cancelled(attempt_future).await else {
                self.record_outcome(attempt, Outcome::Cancelled, None, start);
                return ExecutionResult::Cancelled { attempts: attempt };
            };

            let error = match outcome.into_result() {
                Ok(value) => {
                    self.record_outcome(attempt, Outcome::Success, None, start);
                    return ExecutionResult::Success(value);
                }
                Err(error) => error,
            };

            let retryable = classifier.is_retryable(&error, attempt);
            let outcome = if error.is_timeout() {
                Outcome::TimedOut
            } else {
                Outcome::Failure
            };
            self.record_outcome(attempt, outcome, Some(retryable), start);

            if !retryable || attempt >= max_attempts {
                return ExecutionResult::Failed {
                    error,
                    attempts: attempt,
                };
            }

            let delay = policy
                .jittered_backoff(attempt + 1)
                .unwrap_or(Duration::ZERO);
            self.sink.record(&Event::BackoffWait {
                next_attempt: attempt + 1,
                delay,
            });
            if self
                .until_cancelled(tokio::time::sleep(delay))
                .await
                .is_none()
            {
                return ExecutionResult::Cancelled { attempts: attempt };
            }

            attempt += 1;
        }
    }

    fn record_outcome(
        &self,
        attempt: u32,
        outcome: Outcome,
        retryable: Option<bool>,
        start: Instant,
    ) {
        self.sink.record(&Event::AttemptOutcome {
            attempt,
            outcome,
            retryable,
            elapsed: start.elapsed(),
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Drive `future` unless the cancellation token fires first.
    async fn until_cancelled<Fut: Future>(&self, future: Fut) -> Option<Fut::Output> {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => None,
                output = future => Some(output),
            },
            None => Some(future.await),
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

async fn run_attempt<T, E, Fut>(timeout: Option<Duration>, future: Fut) -> AttemptOutcome<T, E>
where
    Fut: Future<Output = Result<T, E>>,
{
    let result = match timeout {
        Some(duration) => with_timeout(duration, future).await,
        None => future.await.map_err(AttemptError::Operation),
    };
    match result {
        Ok(value) => AttemptOutcome::Success(value),
        Err(AttemptError::Operation(e)) => AttemptOutcome::Failure(e),
        Err(AttemptError::TimedOut { after }) => AttemptOutcome::TimedOut { after },
    }
}

/// Bound a fallible future by `duration`.
///
/// When the timer wins, the future is dropped (and with it whatever work it
/// was doing) and [`AttemptError::TimedOut`] is returned.
///
/// # Example
///
/// ```rust
/// use breakwater::{with_timeout, AttemptError};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let slow = async {
///     tokio::time::sleep(Duration::from_secs(10)).await;
///     Ok::<_, String>(42)
/// };
///
/// match with_timeout(Duration::from_millis(10), slow).await {
///     Err(AttemptError::TimedOut { after }) => assert_eq!(after, Duration::from_millis(10)),
///     other => panic!("expected timeout, got {other:?}"),
/// }
/// # });
/// ```
pub async fn with_timeout<T, E, Fut>(duration: Duration, future: Fut) -> Result<T, AttemptError<E>>
where
    Fut: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AttemptError::Operation(e)),
        Err(_) => Err(AttemptError::TimedOut { after: duration }),
    }
}
