//! Digest Delivery Example
//!
//! Marks a batch of chats as read against a flaky remote API, then notifies
//! an operator that the digest went out. Shows:
//! - Loading executor settings from `ExecutorConfig`
//! - Classifying HTTP statuses as transient or terminal
//! - Per-chat retry sessions inside a bounded fan-out
//! - Reading a partial-failure result map
//!
//! Run with `RUST_LOG=breakwater=debug cargo run --example digest_delivery`
//! to see every attempt, backoff and task completion.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use breakwater::classify::{self, ByKind, Classify, FailureKind};
use breakwater::config::{ExecutorConfig, RetryConfig};
use breakwater::{FanOutExecutor, FanOutTask, RetryExecutor, RetryPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct ApiError {
    status: u16,
    description: &'static str,
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {}: {}", self.status, self.description)
    }
}

impl Classify for ApiError {
    fn failure_kind(&self) -> FailureKind {
        classify::status_code(self.status)
    }
}

/// Pretend remote API: some chats rate-limit a couple of times, one chat
/// was deleted, the rest answer straight away.
#[derive(Clone, Default)]
struct ChatApi {
    requests: Arc<AtomicU32>,
}

impl ChatApi {
    async fn read_messages(&self, chat_id: i64, attempt: u32) -> Result<(), ApiError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(20)).await;
        match chat_id {
            -1 => Err(ApiError {
                status: 400,
                description: "chat not found",
            }),
            id if id % 4 == 0 && attempt < 3 => Err(ApiError {
                status: 429,
                description: "too many requests",
            }),
            _ => Ok(()),
        }
    }

    async fn send_message(&self, text: &str) -> Result<(), ApiError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        println!("  notify: {text}");
        Ok(())
    }
}

fn load_config() -> ExecutorConfig {
    ExecutorConfig {
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 100,
            timeout_ms: Some(2_000),
            ..RetryConfig::default()
        },
        ..ExecutorConfig::default()
    }
}

async fn mark_as_read(
    api: &ChatApi,
    chat_ids: &[i64],
    policy: &RetryPolicy,
    max_parallel: usize,
) -> Result<(), breakwater::FanOutError> {
    println!("\n=== Marking {} chats as read ===", chat_ids.len());

    let retry = RetryExecutor::new();
    let tasks = chat_ids.iter().map(|&chat_id| {
        let api = api.clone();
        let attempts = Arc::new(AtomicU32::new(0));
        FanOutTask::retrying(chat_id, retry.clone(), policy.clone(), ByKind, move || {
            let api = api.clone();
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move { api.read_messages(chat_id, attempt).await }
        })
    });

    let results = FanOutExecutor::new().run(tasks, max_parallel).await?;

    println!(
        "  {} marked, {} failed",
        results.success_count(),
        results.failure_count()
    );
    for (chat_id, failure) in results.failures() {
        println!("  chat {chat_id}: {failure}");
    }
    Ok(())
}

async fn notify_operator(api: &ChatApi, policy: &RetryPolicy) {
    println!("\n=== Notifying operator ===");

    let result = RetryExecutor::new()
        .execute(policy, ByKind, || api.send_message("digest delivered"))
        .await;

    match result.into_result() {
        Ok(()) => println!("  delivered"),
        Err(err) => println!("  notification dropped: {err}"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("breakwater=info")),
        )
        .with_target(true)
        .init();

    let config = load_config();
    let policy = config.retry.clone().into_policy()?;
    let api = ChatApi::default();

    let chat_ids: Vec<i64> = (1..=12).chain([-1]).collect();
    mark_as_read(&api, &chat_ids, &policy, config.fan_out.max_parallel).await?;
    notify_operator(&api, &policy).await;

    println!(
        "\n{} requests sent in total",
        api.requests.load(Ordering::Relaxed)
    );
    Ok(())
}
