//! Property-based tests for retry sessions

use breakwater::classify::Always;
use breakwater::testing::{CallCounter, RecordingSink};
use breakwater::{AttemptError, ExecutionResult, NoopSink, RetryExecutor, RetryPolicy};
use proptest::prelude::*;
use std::time::Duration;
use tokio::time::Instant;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_schedule_doubles_from_base(base_ms in 1u64..5_000, max_attempts in 1u32..10) {
        let base = Duration::from_millis(base_ms);
        let policy = RetryPolicy::exponential(base).with_max_attempts(max_attempts);
        let schedule = policy.schedule();

        prop_assert_eq!(schedule.len(), max_attempts as usize - 1);
        for (i, delay) in schedule.iter().enumerate() {
            prop_assert_eq!(*delay, base * 2u32.pow(i as u32));
        }
    }

    #[test]
    fn prop_max_delay_caps_every_step(base_ms in 1u64..1_000, cap_factor in 1u32..8, max_attempts in 2u32..10) {
        let base = Duration::from_millis(base_ms);
        let cap = base * cap_factor;
        let policy = RetryPolicy::exponential(base)
            .with_max_attempts(max_attempts)
            .with_max_delay(cap);

        for delay in policy.schedule() {
            prop_assert!(delay <= cap);
            prop_assert!(delay >= base);
        }
    }

    #[test]
    fn prop_always_failing_uses_every_attempt(max_attempts in 1u32..8) {
        let counter = CallCounter::new();
        let policy = RetryPolicy::exponential(Duration::from_millis(100)).with_max_attempts(max_attempts);

        let result = paused_runtime().block_on(
            RetryExecutor::new().with_sink(NoopSink).execute(&policy, Always, || {
                let counter = counter.clone();
                async move {
                    counter.increment();
                    Err::<(), _>("unavailable")
                }
            }),
        );

        prop_assert_eq!(
            result,
            ExecutionResult::Failed {
                error: AttemptError::Operation("unavailable"),
                attempts: max_attempts,
            }
        );
        prop_assert_eq!(counter.get(), max_attempts);
    }

    #[test]
    fn prop_success_on_attempt_k_stops_at_k(max_attempts in 1u32..8, k_seed in 0u32..8) {
        let k = k_seed % max_attempts + 1;
        let counter = CallCounter::new();
        let base = Duration::from_millis(50);
        let policy = RetryPolicy::exponential(base).with_max_attempts(max_attempts);

        let (result, elapsed) = paused_runtime().block_on(async {
            let start = Instant::now();
            let result = RetryExecutor::new()
                .with_sink(NoopSink)
                .execute(&policy, Always, || {
                    let counter = counter.clone();
                    async move {
                        if counter.increment() < k {
                            Err("flaky")
                        } else {
                            Ok(k)
                        }
                    }
                })
                .await;
            (result, start.elapsed())
        });

        prop_assert_eq!(result, ExecutionResult::Success(k));
        prop_assert_eq!(counter.get(), k);
        // base * (2^(k-1) - 1): the sum of every backoff before attempt k.
        prop_assert_eq!(elapsed, base * (2u32.pow(k - 1) - 1));
    }

    #[test]
    fn prop_classifier_refusal_stops_session(max_attempts in 2u32..8, stop_seed in 0u32..8) {
        let stop_at = stop_seed % max_attempts + 1;
        let sink = RecordingSink::new();
        let policy = RetryPolicy::exponential(Duration::from_millis(10)).with_max_attempts(max_attempts);

        let result = paused_runtime().block_on(
            RetryExecutor::new().with_sink(sink.clone()).execute(
                &policy,
                move |_: &AttemptError<&'static str>, attempt: u32| attempt < stop_at,
                || async { Err::<(), _>("rejected") },
            ),
        );

        prop_assert_eq!(result.attempts(), Some(stop_at));
        prop_assert_eq!(sink.count("attempt_start"), stop_at as usize);
        prop_assert_eq!(sink.backoff_delays().len(), stop_at as usize - 1);
    }
}
