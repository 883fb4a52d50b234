//! Retry policy types and configuration.

use std::time::Duration;

use crate::retry::error::PolicyError;

/// A retry policy describing how a failed operation is retried.
///
/// Policies are pure data - they describe retry behavior but don't execute it.
/// [`RetryExecutor`](crate::RetryExecutor) reads a policy; it never mutates one.
///
/// # Bounds
///
/// - `max_attempts` counts every attempt, including the first. It is never
///   lower than 1: [`with_max_attempts`](Self::with_max_attempts) clamps `0`
///   up to `1`.
/// - The delay before attempt `n` (n >= 2) is `base_delay * 2^(n-2)`, i.e.
///   `1x, 2x, 4x, ...` the base delay, optionally capped by `max_delay`.
/// - `per_attempt_timeout`, when set, bounds each attempt individually.
///
/// # Examples
///
/// ```rust
/// use breakwater::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::exponential(Duration::from_millis(100))
///     .with_max_attempts(4)
///     .with_timeout(Duration::from_secs(30));
///
/// assert_eq!(policy.max_attempts(), 4);
/// assert_eq!(
///     policy.schedule(),
///     vec![
///         Duration::from_millis(100),
///         Duration::from_millis(200),
///         Duration::from_millis(400),
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    per_attempt_timeout: Option<Duration>,
    max_delay: Option<Duration>,
    jitter: JitterStrategy,
}

/// Strategy for adding randomness to delays.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JitterStrategy {
    /// No jitter applied.
    #[default]
    None,
    /// Add ±percentage randomness to delay.
    Proportional(f64),
    /// Random delay between 0 and calculated delay.
    Full,
}

impl RetryPolicy {
    /// Attempts made by a policy that never called `with_max_attempts`.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// Smallest base delay a policy accepts.
    pub const MIN_BASE_DELAY: Duration = Duration::from_millis(1);

    /// Create a policy with exponential backoff starting at `base_delay`.
    ///
    /// The policy allows [`DEFAULT_MAX_ATTEMPTS`](Self::DEFAULT_MAX_ATTEMPTS)
    /// attempts and has no per-attempt timeout. A base delay shorter than
    /// [`MIN_BASE_DELAY`](Self::MIN_BASE_DELAY) is raised to it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use breakwater::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_secs(1));
    ///
    /// assert_eq!(policy.backoff_before(2), Some(Duration::from_secs(1)));
    /// assert_eq!(policy.backoff_before(3), Some(Duration::from_secs(2)));
    /// assert_eq!(policy.backoff_before(4), None); // only 3 attempts
    /// ```
    pub fn exponential(base_delay: Duration) -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay: base_delay.max(Self::MIN_BASE_DELAY),
            per_attempt_timeout: None,
            max_delay: None,
            jitter: JitterStrategy::None,
        }
    }

    /// Set the total number of attempts, including the first one.
    ///
    /// `0` is treated as `1`: an operation always runs at least once.
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n.max(1);
        self
    }

    /// Bound every attempt by `timeout`.
    ///
    /// An attempt that exceeds the timeout is cancelled and counts as a failed
    /// attempt carrying [`AttemptError::TimedOut`](crate::AttemptError::TimedOut).
    /// A zero timeout would fail every attempt that ever waits, so it is
    /// treated as no timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.per_attempt_timeout = Some(timeout).filter(|t| !t.is_zero());
        self
    }

    /// Remove any per-attempt timeout.
    pub fn without_timeout(mut self) -> Self {
        self.per_attempt_timeout = None;
        self
    }

    /// Set the maximum delay cap.
    ///
    /// Delays will never exceed this value, regardless of the attempt number.
    ///
    /// ```rust
    /// use breakwater::RetryPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = RetryPolicy::exponential(Duration::from_millis(100))
    ///     .with_max_attempts(6)
    ///     .with_max_delay(Duration::from_millis(300));
    ///
    /// // Without cap: 100ms, 200ms, 400ms, 800ms, 1600ms
    /// // With cap:    100ms, 200ms, 300ms, 300ms, 300ms
    /// assert_eq!(policy.backoff_before(4), Some(Duration::from_millis(300)));
    /// ```
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = Some(d);
        self
    }

    /// Add proportional jitter to delays.
    ///
    /// The factor determines the range of randomness. For example, `0.25` means
    /// the actual delay will be ±25% of the calculated delay.
    ///
    /// The factor is clamped to `0.0..=1.0`; NaN and infinities become `0.0`.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, this method does nothing.
    pub fn with_jitter(mut self, factor: f64) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.jitter = JitterStrategy::Proportional(factor);
        self
    }

    /// Use full jitter: a random delay between 0 and the calculated delay.
    ///
    /// **Note**: Requires the `jitter` feature. Without it, this method does nothing.
    pub fn with_full_jitter(mut self) -> Self {
        self.jitter = JitterStrategy::Full;
        self
    }

    /// Total number of attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the second attempt.
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Per-attempt timeout, if any.
    pub fn per_attempt_timeout(&self) -> Option<Duration> {
        self.per_attempt_timeout
    }

    /// Get the maximum delay cap.
    pub fn max_delay(&self) -> Option<Duration> {
        self.max_delay
    }

    /// Get the jitter strategy.
    pub fn jitter(&self) -> &JitterStrategy {
        &self.jitter
    }

    /// Nominal delay to wait before `attempt` (1-indexed), without jitter.
    ///
    /// Returns `None` for the first attempt (nothing to wait for) and for any
    /// attempt beyond `max_attempts`.
    pub fn backoff_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 || attempt > self.max_attempts {
            return None;
        }

        let factor = 2u32.saturating_pow(attempt - 2);
        let delay = self.base_delay.saturating_mul(factor);

        Some(match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        })
    }

    /// Every nominal backoff delay this policy can produce, in order.
    ///
    /// The schedule has `max_attempts - 1` entries.
    pub fn schedule(&self) -> Vec<Duration> {
        (2..=self.max_attempts)
            .filter_map(|attempt| self.backoff_before(attempt))
            .collect()
    }

    /// Delay before `attempt` with jitter applied.
    pub(crate) fn jittered_backoff(&self, attempt: u32) -> Option<Duration> {
        let delay = self.backoff_before(attempt)?;
        Some(self.jitter.apply(delay, self.max_delay))
    }

    /// Check the policy invariants.
    ///
    /// ```rust
    /// use breakwater::{PolicyError, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// assert!(RetryPolicy::exponential(Duration::from_secs(1)).validate().is_ok());
    /// assert_eq!(
    ///     RetryPolicy::exponential(Duration::from_secs(2))
    ///         .with_max_delay(Duration::from_secs(1))
    ///         .validate(),
    ///     Err(PolicyError::MaxDelayBelowBase {
    ///         max_delay: Duration::from_secs(1),
    ///         base_delay: Duration::from_secs(2),
    ///     })
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if self.base_delay.is_zero() {
            return Err(PolicyError::ZeroBaseDelay);
        }
        if self.per_attempt_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PolicyError::ZeroTimeout);
        }
        if let JitterStrategy::Proportional(factor) = self.jitter {
            if !(0.0..=1.0).contains(&factor) {
                return Err(PolicyError::InvalidJitter { factor });
            }
        }
        if let Some(max_delay) = self.max_delay {
            if max_delay < self.base_delay {
                return Err(PolicyError::MaxDelayBelowBase {
                    max_delay,
                    base_delay: self.base_delay,
                });
            }
        }
        Ok(())
    }
}

impl Default for RetryPolicy {
    /// Three attempts, one second base delay, no timeout.
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1))
    }
}

impl JitterStrategy {
    /// Apply jitter to a delay, keeping the result under `max_delay`.
    pub fn apply(&self, delay: Duration, max_delay: Option<Duration>) -> Duration {
        let jittered = match self {
            JitterStrategy::None => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Proportional(factor) if factor.is_finite() && *factor > 0.0 => {
                use rand::Rng;
                let base_secs = delay.as_secs_f64();
                let jitter_range = base_secs * factor.min(1.0);
                let min = (base_secs - jitter_range).max(0.0);
                let max = base_secs + jitter_range;
                let jittered_secs = rand::rng().random_range(min..=max);
                Duration::try_from_secs_f64(jittered_secs).unwrap_or(Duration::MAX)
            }
            JitterStrategy::Proportional(_) => delay,
            #[cfg(feature = "jitter")]
            JitterStrategy::Full => {
                use rand::Rng;
                let max_nanos = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
                Duration::from_nanos(rand::rng().random_range(0..=max_nanos))
            }
            #[cfg(not(feature = "jitter"))]
            JitterStrategy::Full => delay,
        };

        match max_delay {
            Some(max) => jittered.min(max),
            None => jittered,
        }
    }
}
