//! Error types for retry operations.

use std::time::Duration;

/// Why a single attempt failed.
///
/// This is what a [`FailureClassifier`](crate::FailureClassifier) inspects:
/// either the operation's own error, or a timeout imposed by the policy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptError<E> {
    /// The operation itself failed.
    #[error("{0}")]
    Operation(E),
    /// The attempt exceeded the per-attempt timeout and was cancelled.
    #[error("attempt timed out after {after:?}")]
    TimedOut {
        /// The timeout duration that was exceeded.
        after: Duration,
    },
}

impl<E> AttemptError<E> {
    /// Returns true if this attempt timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Get the operation error, if the attempt did not time out.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::TimedOut { .. } => None,
        }
    }

    /// Extract the operation error, if the attempt did not time out.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(e) => Some(e),
            Self::TimedOut { .. } => None,
        }
    }

    /// Transform the operation error.
    pub fn map<F, E2>(self, f: F) -> AttemptError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            Self::Operation(e) => AttemptError::Operation(f(e)),
            Self::TimedOut { after } => AttemptError::TimedOut { after },
        }
    }
}

/// Terminal failure of a retry session, as a plain error value.
///
/// Produced by [`ExecutionResult::into_result`](crate::ExecutionResult::into_result).
///
/// # Examples
///
/// ```rust
/// use breakwater::{AttemptError, RetryError};
///
/// let err: RetryError<&str> = RetryError::Failed {
///     error: AttemptError::Operation("connection reset"),
///     attempts: 3,
/// };
/// assert_eq!(err.to_string(), "gave up after 3 attempt(s): connection reset");
/// assert_eq!(err.attempts(), 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetryError<E> {
    /// The last attempt failed and no further attempt was allowed.
    #[error("gave up after {attempts} attempt(s): {error}")]
    Failed {
        /// The error from the final attempt.
        error: AttemptError<E>,
        /// Total number of attempts made.
        attempts: u32,
    },
    /// The session was cancelled before it could finish.
    #[error("cancelled after {attempts} attempt(s)")]
    Cancelled {
        /// Attempts started before cancellation.
        attempts: u32,
    },
}

impl<E> RetryError<E> {
    /// Number of attempts started during the session.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Failed { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// Returns true if the session was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Get a reference to the final attempt's error.
    pub fn error(&self) -> Option<&AttemptError<E>> {
        match self {
            Self::Failed { error, .. } => Some(error),
            Self::Cancelled { .. } => None,
        }
    }
}

/// A [`RetryPolicy`](crate::RetryPolicy) or retry configuration broke one of
/// its invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    /// `max_attempts` was zero.
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    /// `base_delay` was zero.
    #[error("base_delay must be greater than zero")]
    ZeroBaseDelay,
    /// The per-attempt timeout was zero.
    #[error("per-attempt timeout must be greater than zero")]
    ZeroTimeout,
    /// The proportional jitter factor was NaN, infinite, or outside `0.0..=1.0`.
    #[error("jitter factor {factor} is not within 0.0..=1.0")]
    InvalidJitter {
        /// The rejected factor.
        factor: f64,
    },
    /// `max_delay` would cap every delay below `base_delay`.
    #[error("max_delay ({max_delay:?}) is shorter than base_delay ({base_delay:?})")]
    MaxDelayBelowBase {
        /// The configured cap.
        max_delay: Duration,
        /// The configured base delay.
        base_delay: Duration,
    },
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn test_attempt_error_timeout() {
        let err: AttemptError<String> = AttemptError::TimedOut {
            after: Duration::from_secs(5),
        };
        assert!(err.is_timeout());
        assert!(err.operation_error().is_none());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn test_attempt_error_operation() {
        let err = AttemptError::Operation("inner error".to_string());
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "inner error");
        assert_eq!(err.into_operation_error(), Some("inner error".to_string()));
    }

    #[test]
    fn test_attempt_error_map_keeps_timeout() {
        let err: AttemptError<i32> = AttemptError::TimedOut {
            after: Duration::from_millis(10),
        };
        let mapped = err.map(|code| format!("code {code}"));
        assert_eq!(
            mapped,
            AttemptError::TimedOut {
                after: Duration::from_millis(10)
            }
        );
    }

    #[test]
    fn test_retry_error_display() {
        let err = RetryError::Failed {
            error: AttemptError::Operation("connection failed"),
            attempts: 3,
        };
        let display = err.to_string();
        assert!(display.contains("3 attempt(s)"));
        assert!(display.contains("connection failed"));
    }

    #[test]
    fn test_retry_error_cancelled() {
        let err: RetryError<&str> = RetryError::Cancelled { attempts: 2 };
        assert!(err.is_cancelled());
        assert_eq!(err.attempts(), 2);
        assert!(err.error().is_none());
    }
}
