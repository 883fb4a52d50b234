//! Plain-data configuration for the executors.
//!
//! Durations are integer milliseconds so the types load cleanly from any
//! serde format once the `serde` feature is enabled. Every field has a
//! default, so a config file only needs the values it changes:
//!
//! ```rust
//! use breakwater::config::{ExecutorConfig, RetryConfig};
//! use std::time::Duration;
//!
//! let config = ExecutorConfig {
//!     retry: RetryConfig {
//!         timeout_ms: Some(2_000),
//!         ..RetryConfig::default()
//!     },
//!     ..ExecutorConfig::default()
//! };
//!
//! let policy = config.retry.into_policy().unwrap();
//! assert_eq!(policy.max_attempts(), 3);
//! assert_eq!(policy.per_attempt_timeout(), Some(Duration::from_secs(2)));
//! assert_eq!(config.fan_out.max_parallel, 20);
//! ```

use std::time::Duration;

use crate::retry::{PolicyError, RetryPolicy};

/// Retry parameters (the `retry` section of an [`ExecutorConfig`]).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct RetryConfig {
    /// Total attempts including the first. Must be at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after it.
    pub base_delay_ms: u64,
    /// Per-attempt timeout. `None` lets attempts run indefinitely.
    pub timeout_ms: Option<u64>,
    /// Upper bound on any single backoff delay.
    pub max_delay_ms: Option<u64>,
    /// Proportional jitter factor in `0.0..=1.0`; only honoured with the
    /// `jitter` feature.
    pub jitter: Option<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RetryPolicy::DEFAULT_MAX_ATTEMPTS,
            base_delay_ms: 1_000,
            timeout_ms: None,
            max_delay_ms: None,
            jitter: None,
        }
    }
}

impl RetryConfig {
    /// Build and validate the policy described by this config.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] for zero attempts, a zero base delay, a
    /// zero timeout, a jitter factor outside `0.0..=1.0`, or a max delay
    /// below the base delay.
    pub fn into_policy(self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::try_from(self)
    }
}

impl TryFrom<RetryConfig> for RetryPolicy {
    type Error = PolicyError;

    fn try_from(config: RetryConfig) -> Result<Self, Self::Error> {
        // The builders clamp these, so a config has to be checked first.
        if config.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if config.base_delay_ms == 0 {
            return Err(PolicyError::ZeroBaseDelay);
        }
        if config.timeout_ms == Some(0) {
            return Err(PolicyError::ZeroTimeout);
        }
        if let Some(factor) = config.jitter.filter(|f| !(0.0..=1.0).contains(f)) {
            return Err(PolicyError::InvalidJitter { factor });
        }

        let mut policy = RetryPolicy::exponential(Duration::from_millis(config.base_delay_ms))
            .with_max_attempts(config.max_attempts);
        if let Some(ms) = config.timeout_ms {
            policy = policy.with_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = config.max_delay_ms {
            policy = policy.with_max_delay(Duration::from_millis(ms));
        }
        if let Some(factor) = config.jitter {
            policy = policy.with_jitter(factor);
        }

        policy.validate()?;
        Ok(policy)
    }
}

/// Fan-out parameters (the `fan_out` section of an [`ExecutorConfig`]).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct FanOutConfig {
    /// Most tasks allowed in flight at once.
    pub max_parallel: usize,
}

impl FanOutConfig {
    /// Default concurrency cap for a batch.
    pub const DEFAULT_MAX_PARALLEL: usize = 20;
}

impl Default for FanOutConfig {
    fn default() -> Self {
        Self {
            max_parallel: Self::DEFAULT_MAX_PARALLEL,
        }
    }
}

/// Top-level configuration: one retry section and one fan-out section.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ExecutorConfig {
    /// Retry section.
    pub retry: RetryConfig,
    /// Fan-out section.
    pub fan_out: FanOutConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_default_policy() {
        let policy = RetryConfig::default().into_policy().unwrap();
        assert_eq!(policy, RetryPolicy::default());
        assert_eq!(ExecutorConfig::default().fan_out.max_parallel, 20);
    }

    #[test]
    fn test_all_fields_applied() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 200,
            timeout_ms: Some(30_000),
            max_delay_ms: Some(1_000),
            jitter: None,
        };
        let policy = RetryPolicy::try_from(config).unwrap();
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.base_delay(), Duration::from_millis(200));
        assert_eq!(policy.per_attempt_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(
            policy.schedule(),
            vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(800),
                Duration::from_millis(1_000),
            ]
        );
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let zero_attempts = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert_eq!(zero_attempts.into_policy(), Err(PolicyError::ZeroAttempts));

        let zero_delay = RetryConfig {
            base_delay_ms: 0,
            ..RetryConfig::default()
        };
        assert_eq!(zero_delay.into_policy(), Err(PolicyError::ZeroBaseDelay));

        let zero_timeout = RetryConfig {
            timeout_ms: Some(0),
            ..RetryConfig::default()
        };
        assert_eq!(zero_timeout.into_policy(), Err(PolicyError::ZeroTimeout));

        let bad_jitter = RetryConfig {
            jitter: Some(1.5),
            ..RetryConfig::default()
        };
        assert_eq!(
            bad_jitter.into_policy(),
            Err(PolicyError::InvalidJitter { factor: 1.5 })
        );

        let nan_jitter = RetryConfig {
            jitter: Some(f64::NAN),
            ..RetryConfig::default()
        };
        assert!(matches!(
            nan_jitter.into_policy(),
            Err(PolicyError::InvalidJitter { .. })
        ));

        let low_cap = RetryConfig {
            max_delay_ms: Some(10),
            ..RetryConfig::default()
        };
        assert_eq!(
            low_cap.into_policy(),
            Err(PolicyError::MaxDelayBelowBase {
                max_delay: Duration::from_millis(10),
                base_delay: Duration::from_secs(1),
            })
        );
    }
}
