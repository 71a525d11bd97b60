//! Bounded exponential backoff shared by the catalog and scheduler clients
//! (spec.md §4.B, §4.C: "bounded exponential backoff on transport errors").

use std::future::Future;
use std::time::Duration;

/// Retry `f` up to `max_attempts` times, doubling `base_delay` after each
/// failure classified as transient by `is_transient`. The first non-transient
/// error, or the last transient one once attempts are exhausted, is returned.
pub async fn retry_with_backoff<T, E, F, Fut>(
    max_attempts: u32,
    base_delay: Duration,
    mut is_transient: impl FnMut(&E) -> bool,
    mut f: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt < max_attempts && is_transient(&err) => {
                let delay = base_delay * 2u32.saturating_pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &'static str> = retry_with_backoff(
            5,
            Duration::from_millis(1),
            |_| true,
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                }
            },
        )
        .await;
        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn stops_immediately_on_permanent_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &'static str> = retry_with_backoff(
            5,
            Duration::from_millis(1),
            |_| false,
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("permanent") }
            },
        )
        .await;
        assert_eq!(result, Err("permanent"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
