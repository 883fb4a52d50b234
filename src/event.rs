//! Structured observability events.
//!
//! Both executors report what they do as [`Event`]s handed to an
//! [`EventSink`]. Events never influence control flow: a sink only watches.
//!
//! The default sink, [`TracingSink`], forwards every event to `tracing` so an
//! application that installs a subscriber gets retry and fan-out logs for free:
//!
//! | event             | target                 | level |
//! |-------------------|------------------------|-------|
//! | `attempt_start`   | `breakwater::retry`    | trace |
//! | `attempt_outcome` | `breakwater::retry`    | debug on success, warn on failure |
//! | `backoff_wait`    | `breakwater::retry`    | debug |
//! | `task_admitted`   | `breakwater::fan_out`  | trace |
//! | `task_completed`  | `breakwater::fan_out`  | debug on success, warn on failure |
//!
//! Custom sinks are plain closures:
//!
//! ```rust
//! use breakwater::{Event, RetryExecutor};
//!
//! let executor = RetryExecutor::new().with_sink(|event: &Event| {
//!     eprintln!("{}", event.name());
//! });
//! # let _ = executor;
//! ```

use std::fmt;
use std::time::Duration;

/// How an attempt or a fan-out task ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A value was produced.
    Success,
    /// The operation failed.
    Failure,
    /// The attempt ran past its timeout.
    TimedOut,
    /// The surrounding call was cancelled.
    Cancelled,
    /// The task panicked.
    Panicked,
}

impl Outcome {
    /// Lowercase name used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::TimedOut => "timed_out",
            Self::Cancelled => "cancelled",
            Self::Panicked => "panicked",
        }
    }

    /// Returns true for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single observable step of a retry session or fan-out run.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// An attempt is about to run.
    AttemptStart {
        /// 1-indexed attempt number.
        attempt: u32,
        /// The policy's attempt limit.
        max_attempts: u32,
    },
    /// An attempt finished.
    AttemptOutcome {
        /// 1-indexed attempt number.
        attempt: u32,
        /// How the attempt ended.
        outcome: Outcome,
        /// The classifier's verdict; `None` when nothing was classified.
        retryable: Option<bool>,
        /// Time since the session started, measured on tokio's monotonic clock.
        elapsed: Duration,
    },
    /// The session is sleeping before the next attempt.
    BackoffWait {
        /// The attempt that runs once the wait is over.
        next_attempt: u32,
        /// How long the session sleeps.
        delay: Duration,
    },
    /// A fan-out task was started.
    TaskAdmitted {
        /// Debug rendering of the task key.
        key: String,
        /// Tasks running after this admission.
        in_flight: usize,
    },
    /// A fan-out task produced its outcome.
    TaskCompleted {
        /// Debug rendering of the task key.
        key: String,
        /// How the task ended.
        outcome: Outcome,
        /// Tasks still running.
        in_flight: usize,
    },
}

impl Event {
    /// Stable snake_case name of the event kind.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AttemptStart { .. } => "attempt_start",
            Self::AttemptOutcome { .. } => "attempt_outcome",
            Self::BackoffWait { .. } => "backoff_wait",
            Self::TaskAdmitted { .. } => "task_admitted",
            Self::TaskCompleted { .. } => "task_completed",
        }
    }

    /// The fan-out key, for task events.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::TaskAdmitted { key, .. } | Self::TaskCompleted { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Receives events from the executors.
///
/// `record` is called inline on the executor's control flow, so it must
/// return quickly and never block.
pub trait EventSink: Send + Sync {
    /// Observe one event.
    fn record(&self, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn record(&self, event: &Event) {
        self(event)
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: &Event) {
        match event {
            Event::AttemptStart {
                attempt,
                max_attempts,
            } => {
                tracing::trace!(
                    target: "breakwater::retry",
                    attempt = *attempt,
                    max_attempts = *max_attempts,
                    "attempt_start"
                );
            }
            Event::AttemptOutcome {
                attempt,
                outcome,
                retryable,
                elapsed,
            } => {
                if outcome.is_success() {
                    tracing::debug!(
                        target: "breakwater::retry",
                        attempt = *attempt,
                        outcome = outcome.as_str(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        "attempt_outcome"
                    );
                } else {
                    tracing::warn!(
                        target: "breakwater::retry",
                        attempt = *attempt,
                        outcome = outcome.as_str(),
                        retryable = ?retryable,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "attempt_outcome"
                    );
                }
            }
            Event::BackoffWait {
                next_attempt,
                delay,
            } => {
                tracing::debug!(
                    target: "breakwater::retry",
                    next_attempt = *next_attempt,
                    delay_ms = delay.as_millis() as u64,
                    "backoff_wait"
                );
            }
            Event::TaskAdmitted { key, in_flight } => {
                tracing::trace!(
                    target: "breakwater::fan_out",
                    key = %key,
                    in_flight = *in_flight,
                    "task_admitted"
                );
            }
            Event::TaskCompleted {
                key,
                outcome,
                in_flight,
            } => {
                if outcome.is_success() {
                    tracing::debug!(
                        target: "breakwater::fan_out",
                        key = %key,
                        outcome = outcome.as_str(),
                        in_flight = *in_flight,
                        "task_completed"
                    );
                } else {
                    tracing::warn!(
                        target: "breakwater::fan_out",
                        key = %key,
                        outcome = outcome.as_str(),
                        in_flight = *in_flight,
                        "task_completed"
                    );
                }
            }
        }
    }
}

/// Drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _event: &Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    #[test]
    fn test_event_names() {
        let start = Event::AttemptStart {
            attempt: 1,
            max_attempts: 3,
        };
        let wait = Event::BackoffWait {
            next_attempt: 2,
            delay: Duration::from_secs(1),
        };
        assert_eq!(start.name(), "attempt_start");
        assert_eq!(wait.name(), "backoff_wait");
        assert_eq!(start.key(), None);
    }

    #[test]
    fn test_task_event_exposes_key() {
        let event = Event::TaskCompleted {
            key: "42".to_string(),
            outcome: Outcome::Failure,
            in_flight: 0,
        };
        assert_eq!(event.key(), Some("42"));
        assert_eq!(event.name(), "task_completed");
    }

    #[test]
    fn test_closure_is_a_sink() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let seen = AtomicUsize::new(0);
        let sink = |_: &Event| {
            seen.fetch_add(1, Ordering::SeqCst);
        };
        sink.record(&Event::AttemptStart {
            attempt: 1,
            max_attempts: 1,
        });
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[traced_test]
    #[test]
    fn test_tracing_sink_logs_backoff() {
        TracingSink.record(&Event::BackoffWait {
            next_attempt: 2,
            delay: Duration::from_millis(250),
        });
        assert!(logs_contain("backoff_wait"));
        assert!(logs_contain("delay_ms=250"));
    }

    #[traced_test]
    #[test]
    fn test_tracing_sink_warns_on_failed_task() {
        TracingSink.record(&Event::TaskCompleted {
            key: "chat-7".to_string(),
            outcome: Outcome::Failure,
            in_flight: 3,
        });
        assert!(logs_contain("WARN"));
        assert!(logs_contain("task_completed"));
        assert!(logs_contain("chat-7"));
    }
}
