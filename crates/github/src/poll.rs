use std::{future::Future, time::Duration};

use anyhow::Result;
use tokio::time::{Instant, sleep};

/// Call `f` every `interval` until it yields a value or `timeout` elapses.
///
/// The first attempt happens immediately. The last sleep is clamped to the
/// deadline, so the loop finishes within `timeout` plus the duration of one
/// attempt. Returns `Ok(None)` when the deadline passes without a value.
/// A timeout too large to represent as an instant polls without a deadline.
pub async fn poll_until<T, F, Fut>(
    interval: Duration,
    timeout: Duration,
    mut f: F,
) -> Result<Option<T>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let deadline = Instant::now().checked_add(timeout);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if let Some(value) = f().await? {
            return Ok(Some(value));
        }
        let delay = match deadline {
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    tracing::debug!("Gave up after {} attempts ({}s)", attempt, timeout.as_secs());
                    return Ok(None);
                }
                interval.min(deadline - now)
            }
            None => interval,
        };
        sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use anyhow::anyhow;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_value() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let result = poll_until(Duration::from_secs(5), Duration::from_secs(60), || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok((n == 3).then_some(n)) }
        })
        .await
        .unwrap();
        assert_eq!(result, Some(3));
        assert_eq!(calls.get(), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_deadline() {
        let calls = Cell::new(0);
        let start = Instant::now();
        let result: Option<()> = poll_until(Duration::from_secs(4), Duration::from_secs(10), || {
            calls.set(calls.get() + 1);
            async { Ok(None) }
        })
        .await
        .unwrap();
        assert_eq!(result, None);
        // t=0, 4, 8, then clamped to 10
        assert_eq!(calls.get(), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_timeout_tries_once() {
        let calls = Cell::new(0);
        let result: Option<()> = poll_until(Duration::from_secs(1), Duration::ZERO, || {
            calls.set(calls.get() + 1);
            async { Ok(None) }
        })
        .await
        .unwrap();
        assert_eq!(result, None);
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_propagates_errors() {
        let calls = Cell::new(0);
        let result: Result<Option<()>> =
            poll_until(Duration::from_secs(1), Duration::from_secs(30), || {
                calls.set(calls.get() + 1);
                async { Err(anyhow!("boom")) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_has_no_deadline() {
        let result = poll_until(Duration::from_secs(5), Duration::from_secs(u64::MAX), || async {
            Ok(Some(()))
        })
        .await
        .unwrap();
        assert_eq!(result, Some(()));

        let calls = Cell::new(0);
        let start = Instant::now();
        let result = poll_until(Duration::from_secs(5), Duration::MAX, || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move { Ok((n == 4).then_some(n)) }
        })
        .await
        .unwrap();
        assert_eq!(result, Some(4));
        assert_eq!(start.elapsed(), Duration::from_secs(15));
    }
}
