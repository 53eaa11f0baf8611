//! # Retry Decorator
//!
//! [`RetryResource`] re-drives its inner observable when a result is failure-like and the
//! caller's predicate agrees. It never fabricates a value: a success resets the attempt counter
//! and is forwarded, and a final failure is forwarded as-is.
//!
//! ## Decision table (per delivered result)
//!
//! | Result | Condition | Action |
//! |--------|-----------|--------|
//! | value / empty value | - | reset attempt, clear marker, forward |
//! | failure-like | retry already scheduled | clear marker, forward |
//! | failure-like | `should_retry` false | reset attempt, forward |
//! | failure-like | scheduler returns a token | keep token, wait for `on_due` |
//! | failure-like | scheduler returns `None` | reset attempt, forward |
//!
//! Attempts are numbered from `0`.

use crate::decorators::{OnDue, Predicate, Scheduler};
use crate::framework::{
    is_success, CancellationToken, ExecutionContext, Exclusive, FetchResult, Observable,
    ResultOf, SerialToken, TokenBag,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct RetryState {
    attempt: Option<u32>,
    /// A retry is scheduled and has not fired yet.
    pending: bool,
}

struct RetryShared<O: Observable> {
    inner: O,
    should_retry: Predicate<O>,
    scheduler: Scheduler,
    state: Exclusive<RetryState>,
}

impl<O: Observable> RetryShared<O> {
    /// Returns the result when it must be forwarded now.
    fn handle(
        self: &Arc<Self>,
        result: ResultOf<O>,
        slot: &SerialToken,
    ) -> Option<ResultOf<O>> {
        if is_success(&result) {
            self.state.execute(|state| *state = RetryState::default());
            slot.clear();
            return Some(result);
        }

        if self
            .state
            .execute(|state| std::mem::replace(&mut state.pending, false))
        {
            debug!("Retry already scheduled, forwarding failure");
            return Some(result);
        }

        if !(self.should_retry)(&result) {
            self.state.execute(|state| state.attempt = None);
            return Some(result);
        }

        let claimed = self.state.execute(|state| {
            if state.pending {
                return None;
            }
            let attempt = state.attempt.map_or(0, |attempt| attempt.saturating_add(1));
            state.attempt = Some(attempt);
            state.pending = true;
            Some(attempt)
        });
        let Some(attempt) = claimed else {
            return Some(result);
        };

        let weak = Arc::downgrade(self);
        let on_due: OnDue = Box::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.state.execute(|state| state.pending = false);
                shared.inner.refresh();
            }
        });

        match (self.scheduler)(attempt, on_due) {
            Some(token) => {
                info!(attempt, "Retry scheduled");
                slot.replace(token);
                None
            }
            None => {
                warn!(attempt, "Retry exhausted");
                self.state.execute(|state| *state = RetryState::default());
                Some(result)
            }
        }
    }
}

/// An observable that retries failure-like results of its inner observable.
pub struct RetryResource<O: Observable> {
    shared: Arc<RetryShared<O>>,
}

impl<O: Observable> RetryResource<O> {
    /// Wraps `inner`.
    ///
    /// `scheduler` receives the attempt number and the callback to run when the retry is due.
    /// It returns `None` to give up, or the token that cancels the scheduled retry.
    pub fn new<P, S>(inner: O, should_retry: P, scheduler: S) -> Self
    where
        P: Fn(&ResultOf<O>) -> bool + Send + Sync + 'static,
        S: Fn(u32, OnDue) -> Option<CancellationToken> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(RetryShared {
                inner,
                should_retry: Arc::new(should_retry),
                scheduler: Arc::new(scheduler),
                state: Exclusive::new(RetryState::default()),
            }),
        }
    }

    /// The attempt number of the last scheduled retry, `None` after a reset.
    pub fn attempt(&self) -> Option<u32> {
        self.shared.state.execute(|state| state.attempt)
    }
}

impl<O: Observable> Observable for RetryResource<O> {
    type Value = O::Value;
    type Error = O::Error;

    fn observe_on<F>(&self, context: ExecutionContext, callback: F) -> CancellationToken
    where
        F: Fn(FetchResult<O::Value, O::Error>) + Send + Sync + 'static,
    {
        let bag = TokenBag::new();
        let retries = SerialToken::new();
        bag.push(CancellationToken::from(retries.clone()));
        let weak = Arc::downgrade(&self.shared);

        let token = self.shared.inner.observe_on(context, move |result| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Some(result) = shared.handle(result, &retries) {
                callback(result);
            }
        });
        bag.push(token);

        CancellationToken::from(bag)
    }

    fn refresh(&self) {
        self.shared.inner.refresh();
    }

    fn is_running(&self) -> bool {
        self.shared.inner.is_running() || self.shared.state.execute(|state| state.pending)
    }
}

impl<O: Observable> Clone for RetryResource<O> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
