//! Error types for fan-out runs.

/// Why a whole [`FanOutExecutor::run`](crate::FanOutExecutor::run) call
/// produced no result map.
///
/// Individual task failures never show up here; they are recorded per key
/// as [`TaskFailure`](crate::TaskFailure).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FanOutError {
    /// `max_parallel` was zero, so no task could ever be admitted.
    #[error("max_parallel must be at least 1")]
    ZeroParallelism,

    /// Two tasks in the batch shared a key. Nothing was started.
    #[error("duplicate task key {key}")]
    DuplicateKey {
        /// Debug rendering of the repeated key.
        key: String,
    },

    /// The run was cancelled through its token. In-flight tasks were aborted
    /// and partial results discarded.
    #[error("fan-out run cancelled")]
    Cancelled,
}

impl FanOutError {
    /// Returns true for [`FanOutError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            FanOutError::ZeroParallelism.to_string(),
            "max_parallel must be at least 1"
        );
        let dup = FanOutError::DuplicateKey {
            key: "\"chat-1\"".to_string(),
        };
        assert_eq!(dup.to_string(), "duplicate task key \"chat-1\"");
        assert!(FanOutError::Cancelled.is_cancelled());
        assert!(!dup.is_cancelled());
    }
}
