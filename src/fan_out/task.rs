//! Keyed units of work for a fan-out batch.

use std::fmt;
use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::classify::FailureClassifier;
use crate::retry::{RetryError, RetryExecutor, RetryPolicy};

pub(crate) type BoxedOperation<T, E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, E>> + Send>;

/// A key paired with the operation that produces its outcome.
///
/// The operation is a closure rather than a future: nothing runs, and no
/// future exists, until the executor admits the task into a free slot.
///
/// # Example
///
/// ```rust
/// use breakwater::FanOutTask;
///
/// let task: FanOutTask<u64, (), String> = FanOutTask::new(42, || async { Ok(()) });
/// assert_eq!(*task.key(), 42);
///
/// // Pairs convert too.
/// let task = FanOutTask::from((7u64, || async { Ok::<_, String>("read") }));
/// assert_eq!(*task.key(), 7);
/// ```
pub struct FanOutTask<K, T, E> {
    key: K,
    operation: BoxedOperation<T, E>,
}

impl<K, T, E> FanOutTask<K, T, E> {
    /// Pair `key` with `operation`.
    pub fn new<F, Fut>(key: K, operation: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self {
            key,
            operation: Box::new(move || operation().boxed()),
        }
    }

    /// The task's key.
    pub fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn into_parts(self) -> (K, BoxedOperation<T, E>) {
        (self.key, self.operation)
    }
}

impl<K, T, E> FanOutTask<K, T, RetryError<E>>
where
    T: Send + 'static,
    E: Send + 'static,
{
    /// Wrap `operation` in a retry session, so the batch records the
    /// session's final result for `key`.
    ///
    /// Backoff sleeps happen inside the task and keep its fan-out slot
    /// occupied.
    ///
    /// ```rust
    /// use breakwater::{classify, FanOutExecutor, FanOutTask, RetryExecutor, RetryPolicy};
    /// use std::time::Duration;
    ///
    /// # tokio_test::block_on(async {
    /// let policy = RetryPolicy::exponential(Duration::from_millis(1)).with_max_attempts(2);
    /// let task = FanOutTask::retrying(
    ///     "chat-1",
    ///     RetryExecutor::new(),
    ///     policy,
    ///     classify::Always,
    ///     || async { Err::<(), _>("HTTP 502") },
    /// );
    ///
    /// let results = FanOutExecutor::new().run(vec![task], 4).await.unwrap();
    /// let failure = results.get(&"chat-1").unwrap().as_ref().unwrap_err();
    /// assert_eq!(failure.error().map(|e| e.attempts()), Some(2));
    /// # });
    /// ```
    pub fn retrying<C, F, Fut>(
        key: K,
        executor: RetryExecutor,
        policy: RetryPolicy,
        classifier: C,
        operation: F,
    ) -> Self
    where
        C: FailureClassifier<E> + Send + 'static,
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        Self::new(key, move || async move {
            executor
                .execute(&policy, classifier, operation)
                .await
                .into_result()
        })
    }
}

impl<K, T, E, F, Fut> From<(K, F)> for FanOutTask<K, T, E>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    fn from((key, operation): (K, F)) -> Self {
        Self::new(key, operation)
    }
}

impl<K: fmt::Debug, T, E> fmt::Debug for FanOutTask<K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutTask")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_operation_is_deferred_until_invoked() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        let task: FanOutTask<&str, u8, ()> = FanOutTask::new("k", move || {
            flag.store(true, Ordering::SeqCst);
            async { Ok(1) }
        });
        assert!(!ran.load(Ordering::SeqCst));

        let (key, operation) = task.into_parts();
        assert_eq!(key, "k");
        assert_eq!(operation().await, Ok(1));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_debug_shows_key() {
        let task: FanOutTask<u32, (), ()> = FanOutTask::new(9, || async { Ok(()) });
        assert_eq!(format!("{task:?}"), "FanOutTask { key: 9, .. }");
    }
}
