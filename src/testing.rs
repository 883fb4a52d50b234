//! Testing utilities for code built on breakwater.
//!
//! Retry and fan-out behavior is about *what happened when*: how often an
//! operation ran, which delays were slept, how many tasks overlapped. The
//! helpers here make those observations cheap to write.
//!
//! # Examples
//!
//! ## Recording events
//!
//! ```rust
//! use breakwater::testing::RecordingSink;
//! use breakwater::{classify, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let sink = RecordingSink::new();
//! let policy = RetryPolicy::exponential(Duration::from_millis(1)).with_max_attempts(3);
//!
//! let _ = RetryExecutor::new()
//!     .with_sink(sink.clone())
//!     .execute(&policy, classify::Always, || async { Err::<(), _>("down") })
//!     .await;
//!
//! assert_eq!(
//!     sink.backoff_delays(),
//!     vec![Duration::from_millis(1), Duration::from_millis(2)]
//! );
//! # });
//! ```
//!
//! ## Assertion Macros
//!
//! ```rust
//! use breakwater::{assert_failed, assert_success, AttemptError, ExecutionResult};
//!
//! let ok: ExecutionResult<i32, &str> = ExecutionResult::Success(42);
//! assert_success!(ok);
//!
//! let failed: ExecutionResult<i32, &str> = ExecutionResult::Failed {
//!     error: AttemptError::Operation("boom"),
//!     attempts: 2,
//! };
//! assert_failed!(failed, 2);
//! ```

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::event::{Event, EventSink};

/// Sink that keeps every event in memory.
///
/// Clones share the same buffer, so hand one clone to the executor and keep
/// another for assertions.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingSink {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events, oldest first.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of all recorded events, oldest first.
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(Event::name).collect()
    }

    /// Number of recorded events called `name`.
    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }

    /// Delays of every `backoff_wait` event, in order.
    pub fn backoff_delays(&self) -> Vec<Duration> {
        self.events()
            .iter()
            .filter_map(|event| match event {
                Event::BackoffWait { delay, .. } => Some(*delay),
                _ => None,
            })
            .collect()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl EventSink for RecordingSink {
    fn record(&self, event: &Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Shared invocation counter.
#[derive(Debug, Clone, Default)]
pub struct CallCounter {
    calls: Arc<AtomicU32>,
}

impl CallCounter {
    /// Create a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call and return the new total.
    pub fn increment(&self) -> u32 {
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Calls counted so far.
    pub fn get(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Tracks how many operations run at the same time.
///
/// Each operation calls [`enter`](Self::enter) when it starts and holds the
/// returned guard until it ends.
///
/// ```rust
/// use breakwater::testing::ConcurrencyGauge;
///
/// let gauge = ConcurrencyGauge::new();
/// {
///     let _a = gauge.enter();
///     let _b = gauge.enter();
///     assert_eq!(gauge.running(), 2);
/// }
/// assert_eq!(gauge.running(), 0);
/// assert_eq!(gauge.peak(), 2);
/// assert_eq!(gauge.started(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGauge {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    started: Arc<AtomicUsize>,
}

impl ConcurrencyGauge {
    /// Create a gauge with nothing running.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one operation as running until the guard is dropped.
    pub fn enter(&self) -> GaugeGuard {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        GaugeGuard {
            running: Arc::clone(&self.running),
        }
    }

    /// Operations running right now.
    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously running operations seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Operations started so far.
    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

/// Running marker returned by [`ConcurrencyGauge::enter`].
#[derive(Debug)]
pub struct GaugeGuard {
    running: Arc<AtomicUsize>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.running.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Assert that an [`ExecutionResult`](crate::ExecutionResult) succeeded.
///
/// # Example
///
/// ```rust
/// use breakwater::{assert_success, ExecutionResult};
///
/// let result: ExecutionResult<_, String> = ExecutionResult::Success(42);
/// assert_success!(result);
/// ```
#[macro_export]
macro_rules! assert_success {
    ($result:expr) => {
        match $result {
            $crate::ExecutionResult::Success(_) => {}
            other => {
                panic!("Expected Success, got {:?}", other);
            }
        }
    };
}

/// Assert that an [`ExecutionResult`](crate::ExecutionResult) failed, and
/// optionally after how many attempts.
///
/// # Example
///
/// ```rust
/// use breakwater::{assert_failed, AttemptError, ExecutionResult};
///
/// let result: ExecutionResult<(), _> = ExecutionResult::Failed {
///     error: AttemptError::Operation("unauthorized"),
///     attempts: 1,
/// };
/// assert_failed!(result, 1);
/// ```
#[macro_export]
macro_rules! assert_failed {
    ($result:expr) => {
        match $result {
            $crate::ExecutionResult::Failed { .. } => {}
            other => {
                panic!("Expected Failed, got {:?}", other);
            }
        }
    };
    ($result:expr, $attempts:expr) => {
        match $result {
            $crate::ExecutionResult::Failed { attempts, .. } => {
                assert_eq!(attempts, $attempts, "unexpected attempt count");
            }
            other => {
                panic!("Expected Failed after {} attempts, got {:?}", $attempts, other);
            }
        }
    };
}
