//! # Recovery Decorator
//!
//! [`RecoveryResource`] reacts to a qualifying failure of its primary observable by observing
//! a secondary one (e.g. a token refresh endpoint). When the secondary succeeds the caller's
//! `on_recovered` hook runs and the primary is refreshed. When it fails, the **original**
//! primary result is forwarded.
//!
//! The secondary subscription is one-shot: it is released as soon as the secondary emits, so a
//! later secondary refresh never restarts a recovery that already finished.

use crate::decorators::Predicate;
use crate::framework::{
    is_success, Callback, CancellationToken, ExecutionContext, Exclusive, FetchResult, Observable,
    Response, ResultOf, SerialToken, TokenBag,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

type RecoveredHook<S> =
    Arc<dyn Fn(Response<<S as Observable>::Value, <S as Observable>::Error>) + Send + Sync>;

#[derive(Debug, Default)]
struct RecoveryState {
    /// A recovery is in progress and has not resolved the primary yet.
    pending: bool,
    subscription: Option<TokenBag>,
}

/// Everything a recovery needs to know about the observer that triggered it.
struct Subscriber<O: Observable> {
    callback: Callback<O::Value, O::Error>,
    context: ExecutionContext,
    /// The observation's current recovery, replaced by the next one.
    recovery: SerialToken,
}

struct RecoveryShared<O: Observable, S: Observable> {
    inner: O,
    secondary: S,
    should_recover: Predicate<O>,
    on_recovered: RecoveredHook<S>,
    state: Exclusive<RecoveryState>,
}

impl<O: Observable, S: Observable> RecoveryShared<O, S> {
    fn reset(&self) {
        self.state.execute(|state| {
            state.pending = false;
            state.subscription = None;
        });
    }

    /// Returns the result when it must be forwarded now.
    fn handle(
        self: &Arc<Self>,
        result: ResultOf<O>,
        subscriber: &Subscriber<O>,
    ) -> Option<ResultOf<O>> {
        if is_success(&result) {
            self.reset();
            subscriber.recovery.clear();
            return Some(result);
        }

        let duplicate = self.state.execute(|state| {
            state.subscription = None;
            std::mem::replace(&mut state.pending, false)
        });
        if duplicate {
            debug!("Recovery already attempted, forwarding failure");
            return Some(result);
        }

        if !(self.should_recover)(&result) {
            return Some(result);
        }

        let recovery = TokenBag::new();
        let claimed = self.state.execute(|state| {
            if state.pending {
                return false;
            }
            state.pending = true;
            state.subscription = Some(recovery.clone());
            true
        });
        if !claimed {
            return Some(result);
        }

        info!("Recovery started");
        subscriber
            .recovery
            .replace(CancellationToken::from(recovery.clone()));

        let weak = Arc::downgrade(self);
        let callback = Arc::clone(&subscriber.callback);
        let once = recovery.clone();
        let token = self
            .secondary
            .observe_on(subscriber.context.clone(), move |secondary| {
                once.release();
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                match secondary {
                    Ok(response) if response.is_success() => {
                        info!("Recovery succeeded, refreshing primary");
                        (shared.on_recovered)(response);
                        shared.inner.refresh();
                    }
                    Ok(_) | Err(_) => {
                        warn!("Recovery failed, forwarding original failure");
                        shared.reset();
                        callback(result.clone());
                    }
                }
            });
        recovery.push(token);

        None
    }
}

/// An observable that recovers failures of its inner observable through a secondary one.
pub struct RecoveryResource<O: Observable, S: Observable> {
    shared: Arc<RecoveryShared<O, S>>,
}

impl<O: Observable, S: Observable> RecoveryResource<O, S> {
    pub fn new<P, F>(inner: O, secondary: S, should_recover: P, on_recovered: F) -> Self
    where
        P: Fn(&ResultOf<O>) -> bool + Send + Sync + 'static,
        F: Fn(Response<S::Value, S::Error>) + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(RecoveryShared {
                inner,
                secondary,
                should_recover: Arc::new(should_recover),
                on_recovered: Arc::new(on_recovered),
                state: Exclusive::new(RecoveryState::default()),
            }),
        }
    }

    /// True while a recovery is in progress.
    pub fn is_recovering(&self) -> bool {
        self.shared.state.execute(|state| state.pending)
    }
}

impl<O: Observable, S: Observable> Observable for RecoveryResource<O, S> {
    type Value = O::Value;
    type Error = O::Error;

    fn observe_on<F>(&self, context: ExecutionContext, callback: F) -> CancellationToken
    where
        F: Fn(FetchResult<O::Value, O::Error>) + Send + Sync + 'static,
    {
        let bag = TokenBag::new();
        let subscriber = Subscriber {
            callback: Arc::new(callback),
            context: context.clone(),
            recovery: SerialToken::new(),
        };
        bag.push(CancellationToken::from(subscriber.recovery.clone()));
        let weak = Arc::downgrade(&self.shared);

        let token = self.shared.inner.observe_on(context, move |result| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            if let Some(result) = shared.handle(result, &subscriber) {
                (subscriber.callback)(result);
            }
        });
        bag.push(token);

        CancellationToken::from(bag)
    }

    fn refresh(&self) {
        self.shared.inner.refresh();
    }

    fn is_running(&self) -> bool {
        self.shared.inner.is_running() || self.shared.secondary.is_running()
    }
}

impl<O: Observable, S: Observable> Clone for RecoveryResource<O, S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}
