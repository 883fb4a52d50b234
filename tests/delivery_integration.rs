//! End-to-end tests: retried remote calls fanned out across many chats.

use breakwater::classify::{ByKind, Classify, FailureKind};
use breakwater::config::ExecutorConfig;
use breakwater::testing::{CallCounter, RecordingSink};
use breakwater::{
    assert_failed, assert_success, AttemptError, FanOutExecutor, FanOutTask, RetryError,
    RetryExecutor, TaskFailure,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A fake remote API error carrying an HTTP status.
#[derive(Debug, Clone, PartialEq)]
struct ApiError {
    status: u16,
}

impl Classify for ApiError {
    fn failure_kind(&self) -> FailureKind {
        breakwater::classify::status_code(self.status)
    }
}

/// A scripted remote API: each chat answers with the queued statuses first,
/// then succeeds.
#[derive(Clone, Default)]
struct FakeApi {
    scripts: Arc<Mutex<HashMap<i64, Vec<u16>>>>,
    calls: CallCounter,
}

impl FakeApi {
    fn script(self, chat_id: i64, statuses: &[u16]) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(chat_id, statuses.iter().rev().copied().collect());
        self
    }

    async fn read_messages(&self, chat_id: i64) -> Result<i64, ApiError> {
        self.calls.increment();
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&chat_id)
            .and_then(Vec::pop);
        match next {
            Some(status) => Err(ApiError { status }),
            None => Ok(chat_id),
        }
    }
}

fn policy() -> breakwater::RetryPolicy {
    let mut config = ExecutorConfig::default();
    config.retry.base_delay_ms = 1_000;
    config.retry.timeout_ms = Some(2_000);
    config.retry.into_policy().unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_transient_statuses_are_retried_until_success() {
    let api = FakeApi::default().script(1, &[503, 429]);
    let sink = RecordingSink::new();

    let result = RetryExecutor::new()
        .with_sink(sink.clone())
        .execute(&policy(), ByKind, || api.read_messages(1))
        .await;

    assert_success!(result);
    assert_eq!(api.calls.get(), 3);
    assert_eq!(
        sink.backoff_delays(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_terminal_status_fails_fast() {
    let api = FakeApi::default().script(2, &[403]);

    let result = RetryExecutor::new()
        .execute(&policy(), ByKind, || api.read_messages(2))
        .await;

    assert_failed!(result.clone(), 1);
    assert_eq!(
        result.error(),
        Some(&AttemptError::Operation(ApiError { status: 403 }))
    );
}

#[tokio::test(start_paused = true)]
async fn test_batch_records_partial_failure() {
    let api = FakeApi::default()
        .script(10, &[500])
        .script(20, &[404])
        .script(30, &[502, 502, 502]);
    let retry = RetryExecutor::new();
    let policy = policy();

    let tasks = [10_i64, 20, 30, 40].map(|chat_id| {
        let api = api.clone();
        FanOutTask::retrying(chat_id, retry.clone(), policy.clone(), ByKind, move || {
            let api = api.clone();
            async move { api.read_messages(chat_id).await }
        })
    });

    let config = ExecutorConfig::default();
    let results = FanOutExecutor::new()
        .run(tasks, config.fan_out.max_parallel)
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results.get(&10), Some(&Ok(10)));
    assert_eq!(results.get(&40), Some(&Ok(40)));
    assert_eq!(
        results.get(&20),
        Some(&Err(TaskFailure::Failed(RetryError::Failed {
            error: AttemptError::Operation(ApiError { status: 404 }),
            attempts: 1,
        })))
    );
    let exhausted = results.get(&30).and_then(|r| r.as_ref().err());
    assert_eq!(
        exhausted.and_then(TaskFailure::error).map(RetryError::attempts),
        Some(3)
    );
    // 10: 2 calls, 20: 1, 30: 3, 40: 1
    assert_eq!(api.calls.get(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_slow_attempt_times_out_and_is_retried() {
    let calls = CallCounter::new();
    let sink = RecordingSink::new();

    let result = RetryExecutor::new()
        .with_sink(sink.clone())
        .execute(&policy(), ByKind, || {
            let calls = calls.clone();
            async move {
                if calls.increment() == 1 {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                }
                Ok::<_, ApiError>("read")
            }
        })
        .await;

    assert_eq!(result.into_result(), Ok("read"));
    assert_eq!(calls.get(), 2);
    assert!(sink.events().contains(&breakwater::Event::AttemptOutcome {
        attempt: 1,
        outcome: breakwater::Outcome::TimedOut,
        retryable: Some(true),
        elapsed: Duration::from_secs(2),
    }));
}
