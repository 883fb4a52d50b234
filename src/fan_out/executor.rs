//! The bounded fan-out loop.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use tokio::task::{Id, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::event::{Event, EventSink, Outcome, TracingSink};
use crate::fan_out::error::FanOutError;
use crate::fan_out::results::{FanOutResults, TaskFailure};
use crate::fan_out::task::FanOutTask;

/// Runs a batch of keyed operations with at most `max_parallel` in flight.
///
/// Every task is spawned onto the tokio runtime, so operations must be
/// `Send + 'static`. A failing or panicking task never stops its siblings:
/// its failure is recorded under its key and the batch carries on.
///
/// Dropping the future returned by [`run`](Self::run) aborts every task still
/// in flight; tasks that were never admitted never start.
#[derive(Clone)]
pub struct FanOutExecutor {
    sink: Arc<dyn EventSink>,
    cancel: Option<CancellationToken>,
}

impl FanOutExecutor {
    /// An executor that logs through [`TracingSink`].
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

    /// Abort runs when `token` is cancelled.
    ///
    /// A cancelled run aborts its in-flight tasks, waits for them to wind
    /// down, and returns [`FanOutError::Cancelled`] instead of a partial map.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run every task and collect one outcome per key.
    ///
    /// Tasks are admitted in iteration order while fewer than `max_parallel`
    /// are running; each completion frees a slot for the next one. Completion
    /// order is whatever the operations make it.
    ///
    /// # Errors
    ///
    /// - [`FanOutError::ZeroParallelism`] if `max_parallel` is zero
    /// - [`FanOutError::DuplicateKey`] if two tasks share a key
    /// - [`FanOutError::Cancelled`] if the cancellation token fires
    ///
    /// The first two are reported before any task starts.
    ///
    /// # Example
    ///
    /// ```rust
    /// use breakwater::{FanOutExecutor, FanOutTask};
    ///
    /// # tokio_test::block_on(async {
    /// let tasks = (1..=5u64).map(|chat| {
    ///     FanOutTask::new(chat, move || async move {
    ///         if chat == 3 {
    ///             Err("chat not found")
    ///         } else {
    ///             Ok(chat * 10)
    ///         }
    ///     })
    /// });
    ///
    /// let results = FanOutExecutor::new().run(tasks, 2).await.unwrap();
    /// assert_eq!(results.len(), 5);
    /// assert_eq!(results.success_count(), 4);
    /// assert_eq!(results.failed_keys().collect::<Vec<_>>(), vec![&3]);
    /// # });
    /// ```
    pub async fn run<K, T, E, I>(
        &self,
        tasks: I,
        max_parallel: usize,
    ) -> Result<FanOutResults<K, T, E>, FanOutError>
    where
        I: IntoIterator<Item = FanOutTask<K, T, E>>,
        K: Eq + Hash + fmt::Debug + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        if max_parallel == 0 {
            return Err(FanOutError::ZeroParallelism);
        }

        let tasks: Vec<FanOutTask<K, T, E>> = tasks.into_iter().collect();
        ensure_unique_keys(&tasks)?;

        let mut results = FanOutResults::with_capacity(tasks.len());
        if tasks.is_empty() {
            return Ok(results);
        }

        let mut pending = tasks.into_iter();
        let mut join_set = JoinSet::new();
        let mut in_flight: HashMap<Id, (K, String)> = HashMap::with_capacity(max_parallel);

        loop {
            if self.is_cancelled() {
                join_set.shutdown().await;
                return Err(FanOutError::Cancelled);
            }

            while join_set.len() < max_parallel {
                let Some(task) = pending.next() else {
                    break;
                };
                let (key, operation) = task.into_parts();
                let label = format!("{key:?}");
                let span = tracing::debug_span!(
                    target: "breakwater::fan_out",
                    "fan_out_task",
                    key = %label
                );
                let handle = join_set.spawn(async move { operation().await }.instrument(span));
                self.sink.record(&Event::TaskAdmitted {
                    key: label.clone(),
                    in_flight: join_set.len(),
                });
                in_flight.insert(handle.id(), (key, label));
            }

            let joined = match &self.cancel {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::debug!(
                            target: "breakwater::fan_out",
                            in_flight = join_set.len(),
                            "cancelled, aborting in-flight tasks"
                        );
                        join_set.shutdown().await;
                        return Err(FanOutError::Cancelled);
                    }
                    joined = join_set.join_next_with_id() => joined,
                },
                None => join_set.join_next_with_id().await,
            };
            let Some(joined) = joined else {
                break;
            };

            let (id, outcome) = match joined {
                Ok((id, result)) => (id, result.map_err(TaskFailure::Failed)),
                Err(err) => (err.id(), Err(TaskFailure::from_join_error(err))),
            };
            let Some((key, label)) = in_flight.remove(&id) else {
                continue;
            };

            self.sink.record(&Event::TaskCompleted {
                key: label,
                outcome: event_outcome(&outcome),
                in_flight: join_set.len(),
            });
            results.insert(key, outcome);
        }

        Ok(results)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

impl Default for FanOutExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FanOutExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutExecutor")
            .field("cancellable", &self.cancel.is_some())
            .finish_non_exhaustive()
    }
}

fn ensure_unique_keys<K, T, E>(tasks: &[FanOutTask<K, T, E>]) -> Result<(), FanOutError>
where
    K: Eq + Hash + fmt::Debug,
{
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        if !seen.insert(task.key()) {
            return Err(FanOutError::DuplicateKey {
                key: format!("{:?}", task.key()),
            });
        }
    }
    Ok(())
}

fn event_outcome<T, E>(outcome: &Result<T, TaskFailure<E>>) -> Outcome {
    match outcome {
        Ok(_) => Outcome::Success,
        Err(TaskFailure::Failed(_)) => Outcome::Failure,
        Err(TaskFailure::Panicked { .. }) => Outcome::Panicked,
        Err(TaskFailure::Aborted) => Outcome::Cancelled,
    }
}
