//! # The Observable Capability
//!
//! [`Observable`] is the minimal surface shared by a [`Resource`](crate::framework::Resource)
//! and every decorator wrapping one. Decorators hold an inner `Observable` instead of
//! extending a concrete resource, so they compose in any order:
//!
//! ```rust,ignore
//! let resource = directory
//!     .get_resource(configuration)
//!     .with_recovery(login, |result| is_unauthorized(result), store_token)
//!     .with_retry_after(3, Backoff::Exponential(Duration::from_millis(100)));
//! ```

use crate::framework::observer::ExecutionContext;
use crate::framework::response::FetchResult;
use crate::framework::token::CancellationToken;

/// Result type delivered by an observable.
pub type ResultOf<O> = FetchResult<<O as Observable>::Value, <O as Observable>::Error>;

pub trait Observable: Send + Sync + 'static {
    /// The mapped value type.
    type Value: Clone + Send + Sync + 'static;

    /// The mapped domain error type.
    type Error: Clone + Send + Sync + 'static;

    /// Registers `callback`, delivering through `context`.
    ///
    /// The callback stays registered until the returned token is released or dropped.
    fn observe_on<F>(&self, context: ExecutionContext, callback: F) -> CancellationToken
    where
        F: Fn(FetchResult<Self::Value, Self::Error>) + Send + Sync + 'static;

    /// Registers `callback` with the inline execution context.
    fn observe<F>(&self, callback: F) -> CancellationToken
    where
        F: Fn(FetchResult<Self::Value, Self::Error>) + Send + Sync + 'static,
    {
        self.observe_on(ExecutionContext::Inline, callback)
    }

    /// Forces a fetch that bypasses transport caching, unless one is already running or
    /// nobody is observing.
    ///
    /// A refresh issued while a finished fetch is still delivering its result (for example
    /// from inside an observer callback) is not dropped. It is remembered and starts once that
    /// delivery ends, provided observers remain. Fetches never overlap.
    fn refresh(&self);

    /// True while a fetch (or a pending retry/recovery) is in progress.
    fn is_running(&self) -> bool;
}
