//! Per-attempt and per-session results.

use std::time::Duration;

use crate::retry::error::{AttemptError, RetryError};

/// Result of one attempt. Lives only until the executor classifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T, E> {
    /// The operation produced a value.
    Success(T),
    /// The operation failed with its own error.
    Failure(E),
    /// The attempt ran past the per-attempt timeout.
    TimedOut {
        /// The timeout that expired.
        after: Duration,
    },
}

impl<T, E> AttemptOutcome<T, E> {
    /// Split into the value or the classifiable error.
    pub fn into_result(self) -> Result<T, AttemptError<E>> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(e) => Err(AttemptError::Operation(e)),
            Self::TimedOut { after } => Err(AttemptError::TimedOut { after }),
        }
    }
}

/// Terminal result of a retry session.
///
/// Intermediate failures never show up here; only the value of the
/// successful attempt or the error of the last one.
///
/// # Examples
///
/// ```rust
/// use breakwater::{AttemptError, ExecutionResult};
///
/// let failed: ExecutionResult<(), &str> = ExecutionResult::Failed {
///     error: AttemptError::Operation("HTTP 503"),
///     attempts: 3,
/// };
/// assert!(failed.is_failed());
/// assert_eq!(failed.attempts(), Some(3));
///
/// let ok: ExecutionResult<u32, &str> = ExecutionResult::Success(7);
/// assert_eq!(ok.map(|n| n * 2).into_result(), Ok(14));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum ExecutionResult<T, E> {
    /// An attempt succeeded.
    Success(T),
    /// The last attempt failed: either the classifier declared the failure
    /// terminal or the attempts ran out.
    Failed {
        /// The error from the final attempt.
        error: AttemptError<E>,
        /// Total number of attempts made.
        attempts: u32,
    },
    /// The session was cancelled during an attempt or a backoff wait.
    Cancelled {
        /// Attempts started before cancellation.
        attempts: u32,
    },
}

impl<T, E> ExecutionResult<T, E> {
    /// Returns true if an attempt succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns true if the session gave up.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Returns true if the session was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Attempts made before the session ended, when it did not succeed.
    ///
    /// A successful session does not track its attempt count here; the
    /// `attempt_outcome` event carries it.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::Success(_) => None,
            Self::Failed { attempts, .. } | Self::Cancelled { attempts } => Some(*attempts),
        }
    }

    /// Get a reference to the success value.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Get a reference to the final error.
    pub fn error(&self) -> Option<&AttemptError<E>> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Transform the success value.
    pub fn map<U, F>(self, f: F) -> ExecutionResult<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => ExecutionResult::Success(f(value)),
            Self::Failed { error, attempts } => ExecutionResult::Failed { error, attempts },
            Self::Cancelled { attempts } => ExecutionResult::Cancelled { attempts },
        }
    }

    /// Convert into a `Result`, folding failure and cancellation into
    /// [`RetryError`].
    pub fn into_result(self) -> Result<T, RetryError<E>> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failed { error, attempts } => Err(RetryError::Failed { error, attempts }),
            Self::Cancelled { attempts } => Err(RetryError::Cancelled { attempts }),
        }
    }
}

impl<T, E> From<ExecutionResult<T, E>> for Result<T, RetryError<E>> {
    fn from(result: ExecutionResult<T, E>) -> Self {
        result.into_result()
    }
}
