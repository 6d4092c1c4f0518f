use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use flowforge::{with_backoff, GenerationError, ProviderId, RetryPolicy};

fn overloaded() -> GenerationError {
    GenerationError::Transport {
        provider: ProviderId::Claude,
        message: "Overloaded".to_string(),
        status: Some(529),
    }
}

fn hard_failure() -> GenerationError {
    GenerationError::Transport {
        provider: ProviderId::Claude,
        message: "invalid api key".to_string(),
        status: Some(401),
    }
}

#[tokio::test(start_paused = true)]
async fn overloaded_twice_then_success_with_two_backoff_delays() {
    let attempts = AtomicU32::new(0);
    let started = tokio::time::Instant::now();

    let result = with_backoff(
        || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(overloaded())
                } else {
                    Ok("document")
                }
            }
        },
        &RetryPolicy::default(),
    )
    .await;

    assert_eq!(result.unwrap(), "document");
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    // Exactly two delays: 2s after the first failure, 4s after the second.
    assert_eq!(started.elapsed(), Duration::from_millis(6000));
}

#[tokio::test(start_paused = true)]
async fn non_overloaded_errors_propagate_without_retry() {
    let attempts = AtomicU32::new(0);
    let started = tokio::time::Instant::now();

    let result: Result<(), _> = with_backoff(
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(hard_failure()) }
        },
        &RetryPolicy::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(GenerationError::Transport { status: Some(401), .. })
    ));
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn exhausted_attempts_yield_still_overloaded() {
    let attempts = AtomicU32::new(0);

    let result: Result<(), _> = with_backoff(
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(overloaded()) }
        },
        &RetryPolicy::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(GenerationError::StillOverloaded { attempts: 3 })
    ));
    // max_attempts invocations, not max_attempts + 1.
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn delay_is_capped_at_the_policy_maximum() {
    let policy = RetryPolicy {
        max_attempts: 5,
        ..RetryPolicy::default()
    };
    let attempts = AtomicU32::new(0);
    let started = tokio::time::Instant::now();

    let result: Result<(), _> = with_backoff(
        || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(overloaded()) }
        },
        &policy,
    )
    .await;

    assert!(result.is_err());
    // 2s + 4s + 8s + 10s (capped) = 24s across four delays.
    assert_eq!(started.elapsed(), Duration::from_millis(24_000));
}
