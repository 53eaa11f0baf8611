//! # Backoff
//!
//! Pure delay functions for retry scheduling, plus [`retry_after`], a ready-made scheduler that
//! sleeps on a tokio runtime.

use crate::decorators::OnDue;
use crate::framework::CancellationToken;
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::debug;

/// How the delay grows with the attempt number. Every variant carries the base delay `d`.
///
/// All arithmetic saturates, so large attempts yield very long delays instead of overflowing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// `d`
    Constant(Duration),
    /// `attempt * d`
    Linear(Duration),
    /// `attempt² * d`
    Quadratic(Duration),
    /// `attempt³ * d`
    Cubic(Duration),
    /// `2^attempt * d`
    Exponential(Duration),
    /// `fib(attempt) * d`, with `fib(0) = 0` and `fib(1) = 1`
    Fibonacci(Duration),
}

impl Backoff {
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Constant(base) => base,
            Backoff::Linear(base) => base.saturating_mul(attempt),
            Backoff::Quadratic(base) => base.saturating_mul(attempt.saturating_pow(2)),
            Backoff::Cubic(base) => base.saturating_mul(attempt.saturating_pow(3)),
            Backoff::Exponential(base) => base.saturating_mul(2u32.saturating_pow(attempt)),
            Backoff::Fibonacci(base) => base.saturating_mul(fibonacci(attempt)),
        }
    }
}

fn fibonacci(n: u32) -> u32 {
    let (mut current, mut next) = (0u32, 1u32);
    for _ in 0..n {
        (current, next) = (next, current.saturating_add(next));
    }
    current
}

/// A scheduler that gives up once `attempt >= max_attempts` and otherwise calls `on_due`
/// after `backoff.delay(attempt)`.
///
/// # Panics
/// When called outside a tokio runtime. Use [`retry_after_on`] otherwise.
pub fn retry_after(
    max_attempts: u32,
    backoff: Backoff,
) -> impl Fn(u32, OnDue) -> Option<CancellationToken> + Send + Sync + 'static {
    retry_after_on(Handle::current(), max_attempts, backoff)
}

/// Like [`retry_after`], sleeping on `handle`.
pub fn retry_after_on(
    handle: Handle,
    max_attempts: u32,
    backoff: Backoff,
) -> impl Fn(u32, OnDue) -> Option<CancellationToken> + Send + Sync + 'static {
    move |attempt: u32, on_due: OnDue| {
        if attempt >= max_attempts {
            return None;
        }
        let delay = backoff.delay(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "Retry timer armed");

        let timer = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            on_due();
        });
        Some(CancellationToken::new(move || timer.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    const D: Duration = Duration::from_millis(10);

    fn delays(backoff: Backoff) -> Vec<u128> {
        (0..6).map(|n| backoff.delay(n).as_millis()).collect()
    }

    #[test]
    fn test_growth_curves() {
        assert_eq!(delays(Backoff::Constant(D)), vec![10, 10, 10, 10, 10, 10]);
        assert_eq!(delays(Backoff::Linear(D)), vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(delays(Backoff::Quadratic(D)), vec![0, 10, 40, 90, 160, 250]);
        assert_eq!(delays(Backoff::Cubic(D)), vec![0, 10, 80, 270, 640, 1250]);
        assert_eq!(delays(Backoff::Exponential(D)), vec![10, 20, 40, 80, 160, 320]);
        assert_eq!(delays(Backoff::Fibonacci(D)), vec![0, 10, 10, 20, 30, 50]);
    }

    #[test]
    fn test_saturates_instead_of_overflowing() {
        assert_eq!(Backoff::Exponential(D).delay(200), D.saturating_mul(u32::MAX));
        assert_eq!(Backoff::Cubic(Duration::MAX).delay(2), Duration::MAX);
        assert_eq!(fibonacci(100), u32::MAX);
    }

    fn counting() -> (Arc<AtomicU32>, OnDue) {
        let fired = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&fired);
        let on_due: OnDue = Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (fired, on_due)
    }

    #[tokio::test]
    async fn test_retry_after_fires_then_gives_up() {
        let schedule = retry_after(2, Backoff::Constant(D));

        let (fired, on_due) = counting();
        let token = schedule(1, on_due);
        assert!(token.is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        let (fired, on_due) = counting();
        assert!(schedule(2, on_due).is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_released_token_cancels_timer() {
        let schedule = retry_after(3, Backoff::Constant(Duration::from_millis(30)));
        let (fired, on_due) = counting();

        let token = schedule(0, on_due);
        drop(token);
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
