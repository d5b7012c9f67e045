//! Bounded fixed-interval retry for transient errors.

use crate::error::Result;
use crate::types::RetryPolicy;
use std::time::Duration;

/// Execute an operation with retry logic.
///
/// Retries the operation while it returns a retryable error, pausing
/// `policy.interval()` between attempts through `sleep`. Non-retryable
/// errors are returned immediately. When the budget is exhausted the last
/// transient error is returned; nothing here ever loops unbounded.
///
/// `on_retry` is called before each pause with the 1-indexed attempt that
/// just failed, the attempt budget, the error, and the delay.
///
/// On success returns the value together with the number of attempts made.
pub fn with_retry<T, F, N, S>(
    policy: &RetryPolicy,
    mut on_retry: N,
    sleep: S,
    mut operation: F,
) -> Result<(T, u32)>
where
    F: FnMut() -> Result<T>,
    N: FnMut(u32, u32, &crate::Error, Duration),
    S: Fn(Duration),
{
    let max_attempts = policy.max_attempts();
    let delay = policy.interval();
    let mut attempt = 1;

    loop {
        match operation() {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if !e.is_retryable() || attempt >= max_attempts => return Err(e),
            Err(e) => {
                log::warn!("attempt {attempt}/{max_attempts} failed: {e}");
                on_retry(attempt, max_attempts, &e, delay);
                sleep(delay);
                attempt += 1;
            }
        }
    }
}
