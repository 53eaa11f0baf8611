//! Decorators that re-drive an [`Observable`] after failure-like results.
//!
//! Decorators wrap any [`Observable`] (a resource or another decorator) and are observable
//! themselves, so they compose freely. They never fabricate a value and never swallow a final
//! failure; they only decide *when* to ask the inner observable for another fetch.
//!
//! # Main Components
//!
//! - [`RetryResource`] - Retries on a schedule ([`Backoff`], [`retry_after`])
//! - [`RecoveryResource`] - Recovers through a secondary observable, then retries once
//! - [`ObservableExt`] - Fluent constructors for both

mod backoff;
mod recovery;
mod retry;

pub use backoff::{retry_after, retry_after_on, Backoff};
pub use recovery::RecoveryResource;
pub use retry::RetryResource;

use crate::framework::{CancellationToken, Observable, Response, ResultOf};
use std::sync::Arc;

/// Called by a retry scheduler when the retry is due.
pub type OnDue = Box<dyn FnOnce() + Send>;

type Predicate<O> = Arc<dyn Fn(&ResultOf<O>) -> bool + Send + Sync>;

type Scheduler = Arc<dyn Fn(u32, OnDue) -> Option<CancellationToken> + Send + Sync>;

/// Fluent decorator constructors, available on every [`Observable`].
pub trait ObservableExt: Observable + Sized {
    /// Retries results accepted by `should_retry`, as scheduled by `scheduler`.
    fn with_retry<P, S>(self, should_retry: P, scheduler: S) -> RetryResource<Self>
    where
        P: Fn(&ResultOf<Self>) -> bool + Send + Sync + 'static,
        S: Fn(u32, OnDue) -> Option<CancellationToken> + Send + Sync + 'static,
    {
        RetryResource::new(self, should_retry, scheduler)
    }

    /// Retries every failure-like result up to `max_attempts` times on the current tokio
    /// runtime.
    ///
    /// # Panics
    /// When called outside a tokio runtime.
    fn with_retry_after(self, max_attempts: u32, backoff: Backoff) -> RetryResource<Self> {
        RetryResource::new(self, |_: &ResultOf<Self>| true, retry_after(max_attempts, backoff))
    }

    /// Recovers results accepted by `should_recover` through `secondary`.
    fn with_recovery<S, P, F>(
        self,
        secondary: S,
        should_recover: P,
        on_recovered: F,
    ) -> RecoveryResource<Self, S>
    where
        S: Observable,
        P: Fn(&ResultOf<Self>) -> bool + Send + Sync + 'static,
        F: Fn(Response<S::Value, S::Error>) + Send + Sync + 'static,
    {
        RecoveryResource::new(self, secondary, should_recover, on_recovered)
    }
}

impl<O: Observable> ObservableExt for O {}
