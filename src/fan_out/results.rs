//! Per-key outcomes of a fan-out batch.

use std::any::Any;
use std::collections::hash_map::{self, HashMap};
use std::hash::Hash;

use tokio::task::JoinError;

/// Why one task in a batch produced no value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskFailure<E> {
    /// The operation returned an error.
    #[error("{0}")]
    Failed(E),

    /// The operation panicked. Sibling tasks were unaffected.
    #[error("task panicked: {message}")]
    Panicked {
        /// The panic payload, when it was a string.
        message: String,
    },

    /// The runtime aborted the task before it finished.
    #[error("task aborted")]
    Aborted,
}

impl<E> TaskFailure<E> {
    /// The operation's error, if the operation itself failed.
    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Consume and return the operation's error, if any.
    pub fn into_error(self) -> Option<E> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the task panicked.
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    pub(crate) fn from_join_error(err: JoinError) -> Self {
        match err.try_into_panic() {
            Ok(payload) => Self::Panicked {
                message: panic_message(payload.as_ref()),
            },
            Err(_) => Self::Aborted,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Outcome of every task in a batch, keyed by task key.
///
/// After a successful [`run`](crate::FanOutExecutor::run) there is exactly
/// one entry per submitted key. Iteration order is unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOutResults<K, T, E>
where
    K: Eq + Hash,
{
    entries: HashMap<K, Result<T, TaskFailure<E>>>,
}

impl<K, T, E> FanOutResults<K, T, E>
where
    K: Eq + Hash,
{
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
        }
    }

    pub(crate) fn insert(&mut self, key: K, outcome: Result<T, TaskFailure<E>>) {
        self.entries.insert(key, outcome);
    }

    /// Number of recorded tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the batch was empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Outcome recorded for `key`.
    pub fn get(&self, key: &K) -> Option<&Result<T, TaskFailure<E>>> {
        self.entries.get(key)
    }

    /// Returns true if `key` has an outcome.
    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// All outcomes.
    pub fn iter(&self) -> hash_map::Iter<'_, K, Result<T, TaskFailure<E>>> {
        self.entries.iter()
    }

    /// Keys that produced a value, with the value.
    pub fn successes(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entries
            .iter()
            .filter_map(|(key, outcome)| outcome.as_ref().ok().map(|value| (key, value)))
    }

    /// Keys that failed, with the failure.
    pub fn failures(&self) -> impl Iterator<Item = (&K, &TaskFailure<E>)> {
        self.entries
            .iter()
            .filter_map(|(key, outcome)| outcome.as_ref().err().map(|failure| (key, failure)))
    }

    /// Keys that failed.
    pub fn failed_keys(&self) -> impl Iterator<Item = &K> {
        self.failures().map(|(key, _)| key)
    }

    /// Number of tasks that produced a value.
    pub fn success_count(&self) -> usize {
        self.entries.values().filter(|outcome| outcome.is_ok()).count()
    }

    /// Number of tasks that failed.
    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// The underlying map.
    pub fn into_map(self) -> HashMap<K, Result<T, TaskFailure<E>>> {
        self.entries
    }
}

impl<K, T, E> IntoIterator for FanOutResults<K, T, E>
where
    K: Eq + Hash,
{
    type Item = (K, Result<T, TaskFailure<E>>);
    type IntoIter = hash_map::IntoIter<K, Result<T, TaskFailure<E>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a, K, T, E> IntoIterator for &'a FanOutResults<K, T, E>
where
    K: Eq + Hash,
{
    type Item = (&'a K, &'a Result<T, TaskFailure<E>>);
    type IntoIter = hash_map::Iter<'a, K, Result<T, TaskFailure<E>>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
