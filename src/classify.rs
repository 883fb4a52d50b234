//! Failure classification: which failures deserve another attempt.
//!
//! A [`FailureClassifier`] is supplied per call to
//! [`RetryExecutor::execute`](crate::RetryExecutor::execute). It sees the
//! failed attempt's [`AttemptError`] and the 1-indexed attempt number, and
//! answers whether the failure is transient. It never sees cancellation:
//! cancelling a session always stops it.
//!
//! Any `Fn(&AttemptError<E>, u32) -> bool` closure is a classifier. The unit
//! structs in this module cover the common cases.
//!
//! # Examples
//!
//! ```rust
//! use breakwater::classify::{status_code, FailureKind};
//! use breakwater::{AttemptError, FailureClassifier};
//!
//! #[derive(Debug)]
//! struct ApiError {
//!     status: u16,
//! }
//!
//! let only_transient_statuses = |err: &AttemptError<ApiError>, _attempt: u32| match err {
//!     AttemptError::TimedOut { .. } => true,
//!     AttemptError::Operation(e) => status_code(e.status) == FailureKind::Transient,
//! };
//!
//! assert!(only_transient_statuses.is_retryable(&AttemptError::Operation(ApiError { status: 429 }), 1));
//! assert!(!only_transient_statuses.is_retryable(&AttemptError::Operation(ApiError { status: 401 }), 1));
//! ```

use std::io;

use crate::retry::AttemptError;

/// Decides whether a failed attempt may be retried.
pub trait FailureClassifier<E> {
    /// Returns true if the failure is transient and another attempt is worth
    /// making. `attempt` is the 1-indexed number of the attempt that failed.
    fn is_retryable(&self, error: &AttemptError<E>, attempt: u32) -> bool;
}

impl<E, F> FailureClassifier<E> for F
where
    F: Fn(&AttemptError<E>, u32) -> bool,
{
    fn is_retryable(&self, error: &AttemptError<E>, attempt: u32) -> bool {
        self(error, attempt)
    }
}

/// Broad failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rate limiting, server-side errors, timeouts, momentary network failures.
    Transient,
    /// Bad requests, missing credentials, unknown targets, malformed payloads.
    Terminal,
}

impl FailureKind {
    /// Returns true for [`FailureKind::Transient`].
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// Error types that know whether they are transient.
///
/// Implement this for a domain error and classify with [`ByKind`].
pub trait Classify {
    /// Kind of this failure.
    fn failure_kind(&self) -> FailureKind;
}

/// Classify an HTTP status code.
///
/// `429` (rate limited) and every `5xx` are transient; anything else
/// (`400`, `401`, `403`, `404`, ...) is terminal.
///
/// ```rust
/// use breakwater::classify::{status_code, FailureKind};
///
/// assert_eq!(status_code(429), FailureKind::Transient);
/// assert_eq!(status_code(502), FailureKind::Transient);
/// assert_eq!(status_code(404), FailureKind::Terminal);
/// ```
pub fn status_code(code: u16) -> FailureKind {
    match code {
        429 | 500..=599 => FailureKind::Transient,
        _ => FailureKind::Terminal,
    }
}

impl Classify for io::Error {
    fn failure_kind(&self) -> FailureKind {
        match self.kind() {
            io::ErrorKind::TimedOut
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
            | io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => FailureKind::Transient,
            _ => FailureKind::Terminal,
        }
    }
}

/// Retries every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl<E> FailureClassifier<E> for Always {
    fn is_retryable(&self, _error: &AttemptError<E>, _attempt: u32) -> bool {
        true
    }
}

/// Never retries: the first failure is final.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl<E> FailureClassifier<E> for Never {
    fn is_retryable(&self, _error: &AttemptError<E>, _attempt: u32) -> bool {
        false
    }
}

/// Retries timed-out attempts only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutsOnly;

impl<E> FailureClassifier<E> for TimeoutsOnly {
    fn is_retryable(&self, error: &AttemptError<E>, _attempt: u32) -> bool {
        error.is_timeout()
    }
}

/// Retries timeouts and operation errors whose [`Classify`] kind is transient.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByKind;

impl<E: Classify> FailureClassifier<E> for ByKind {
    fn is_retryable(&self, error: &AttemptError<E>, _attempt: u32) -> bool {
        match error {
            AttemptError::TimedOut { .. } => true,
            AttemptError::Operation(e) => e.failure_kind().is_transient(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug)]
    struct Status(u16);

    impl Classify for Status {
        fn failure_kind(&self) -> FailureKind {
            status_code(self.0)
        }
    }

    fn timed_out<E>() -> AttemptError<E> {
        AttemptError::TimedOut {
            after: Duration::from_secs(1),
        }
    }

    #[test]
    fn status_429_and_5xx_transient() {
        assert_eq!(status_code(429), FailureKind::Transient);
        assert_eq!(status_code(500), FailureKind::Transient);
        assert_eq!(status_code(503), FailureKind::Transient);
        assert_eq!(status_code(599), FailureKind::Transient);
    }

    #[test]
    fn status_4xx_terminal() {
        assert_eq!(status_code(400), FailureKind::Terminal);
        assert_eq!(status_code(401), FailureKind::Terminal);
        assert_eq!(status_code(404), FailureKind::Terminal);
        assert_eq!(status_code(600), FailureKind::Terminal);
    }

    #[test]
    fn by_kind_retries_timeouts_and_transient_errors() {
        assert!(ByKind.is_retryable(&timed_out::<Status>(), 1));
        assert!(ByKind.is_retryable(&AttemptError::Operation(Status(503)), 2));
        assert!(!ByKind.is_retryable(&AttemptError::Operation(Status(400)), 1));
    }

    #[test]
    fn io_errors_classified() {
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert_eq!(reset.failure_kind(), FailureKind::Transient);
        assert_eq!(denied.failure_kind(), FailureKind::Terminal);
    }

    #[test]
    fn fixed_classifiers() {
        let err: AttemptError<&str> = AttemptError::Operation("boom");
        assert!(Always.is_retryable(&err, 1));
        assert!(!Never.is_retryable(&err, 1));
        assert!(!TimeoutsOnly.is_retryable(&err, 1));
        assert!(TimeoutsOnly.is_retryable(&timed_out::<&str>(), 1));
    }

    #[test]
    fn closure_sees_attempt_number() {
        let first_two_only = |_: &AttemptError<&str>, attempt: u32| attempt < 3;
        let err = AttemptError::Operation("boom");
        assert!(first_two_only.is_retryable(&err, 2));
        assert!(!first_two_only.is_retryable(&err, 3));
    }
}
