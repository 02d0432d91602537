//! Bounded retry with fixed backoff.
//!
//! Replaces ad hoc retry-with-sleep loops in the adapters. Used for
//! provider cold starts ("model is loading" responses), which resolve
//! after a fixed warm-up rather than benefiting from exponential backoff.

use std::future::Future;
use std::time::Duration;

/// Run `op` until `is_retryable` rejects its output or `max_retries`
/// extra attempts are exhausted, sleeping `backoff` between attempts.
///
/// The final output is returned as-is; callers decide how a still-
/// retryable outcome degrades (the adapters map it to UNCERTAIN).
pub async fn with_retry<T, F, Fut, P>(
    max_retries: u32,
    backoff: Duration,
    mut op: F,
    mut is_retryable: P,
) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    P: FnMut(&T) -> bool,
{
    let mut attempt = 0;
    loop {
        let outcome = op().await;
        if attempt < max_retries && is_retryable(&outcome) {
            attempt += 1;
            tracing::info!(attempt, backoff_secs = backoff.as_secs(), "retrying after backoff");
            tokio::time::sleep(backoff).await;
            continue;
        }
        return outcome;
    }
}
