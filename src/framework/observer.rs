//! # Observers
//!
//! An [`Observer`] wraps a caller's callback together with the [`ExecutionContext`] it was
//! registered with. Every emission goes through a per-observer serial queue, so one result is
//! fully processed by the callback before the next one starts. There is no ordering across
//! different observers.

use crate::framework::response::FetchResult;
use crate::framework::sync::Exclusive;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Shared result callback.
pub type Callback<T, E> = Arc<dyn Fn(FetchResult<T, E>) + Send + Sync>;

/// Where an observer's callback runs.
#[derive(Debug, Clone, Default)]
pub enum ExecutionContext {
    /// On the thread that emits, serialized through a trampoline: an emission that arrives
    /// while the callback is already running (re-entrantly or from another thread) is queued
    /// and delivered by the thread that is currently draining.
    #[default]
    Inline,
    /// On a dedicated drain task spawned on this tokio runtime.
    Runtime(Handle),
}

impl ExecutionContext {
    /// The runtime of the calling thread if there is one, `Inline` otherwise.
    pub fn current() -> Self {
        Handle::try_current()
            .map(ExecutionContext::Runtime)
            .unwrap_or(ExecutionContext::Inline)
    }
}

static NEXT_OBSERVER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one `observe` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    fn next() -> Self {
        ObserverId(NEXT_OBSERVER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer_{}", self.0)
    }
}

struct Trampoline<T> {
    pending: VecDeque<T>,
    draining: bool,
}

/// Clears the draining flag when a callback unwinds, so the next emission drains again.
struct DrainGuard<'a, T> {
    queue: &'a Exclusive<Trampoline<T>>,
}

impl<T> Drop for DrainGuard<'_, T> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.queue.execute(|queue| queue.draining = false);
        }
    }
}

enum Delivery<T, E> {
    Inline {
        callback: Callback<T, E>,
        queue: Exclusive<Trampoline<FetchResult<T, E>>>,
    },
    Runtime {
        sender: mpsc::UnboundedSender<FetchResult<T, E>>,
    },
}

/// A registered callback bound to its serial execution context.
pub struct Observer<T, E> {
    id: ObserverId,
    delivery: Delivery<T, E>,
}

impl<T, E> Observer<T, E>
where
    T: Send + 'static,
    E: Send + 'static,
{
    pub fn new(context: ExecutionContext, callback: Callback<T, E>) -> Self {
        let delivery = match context {
            ExecutionContext::Inline => Delivery::Inline {
                callback,
                queue: Exclusive::new(Trampoline {
                    pending: VecDeque::new(),
                    draining: false,
                }),
            },
            ExecutionContext::Runtime(handle) => {
                let (sender, mut receiver) = mpsc::unbounded_channel::<FetchResult<T, E>>();
                // The drain task ends once the observer (and with it the sender) is dropped.
                handle.spawn(async move {
                    while let Some(result) = receiver.recv().await {
                        callback(result);
                    }
                });
                Delivery::Runtime { sender }
            }
        };

        Self {
            id: ObserverId::next(),
            delivery,
        }
    }

    pub fn id(&self) -> ObserverId {
        self.id
    }

    /// Delivers `result` through this observer's serial queue.
    pub fn emit(&self, result: FetchResult<T, E>) {
        match &self.delivery {
            Delivery::Inline { callback, queue } => {
                let start = queue.execute(|queue| {
                    queue.pending.push_back(result);
                    !std::mem::replace(&mut queue.draining, true)
                });
                if !start {
                    return;
                }

                let _guard = DrainGuard { queue };
                loop {
                    let next = queue.execute(|queue| {
                        let next = queue.pending.pop_front();
                        if next.is_none() {
                            queue.draining = false;
                        }
                        next
                    });
                    match next {
                        Some(result) => callback(result),
                        None => break,
                    }
                }
            }
            Delivery::Runtime { sender } => {
                // A closed channel means the runtime is gone; nothing left to deliver to.
                let _ = sender.send(result);
            }
        }
    }
}

impl<T, E> fmt::Debug for Observer<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = match self.delivery {
            Delivery::Inline { .. } => "inline",
            Delivery::Runtime { .. } => "runtime",
        };
        f.debug_struct("Observer")
            .field("id", &self.id)
            .field("context", &context)
            .finish()
    }
}
