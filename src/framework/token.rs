//! # Cancellation Tokens
//!
//! A [`CancellationToken`] is the handle returned by every `observe` call. Holding it means
//! "I am still interested". Releasing it runs the unregistration side effect exactly once.
//!
//! Release is explicit and idempotent: call [`CancellationToken::release`] from any thread,
//! as many times as you like. Dropping the token releases it as well, so a token stored in a
//! struct field lives exactly as long as its owner.
//!
//! A [`TokenBag`] aggregates child tokens. Decorators return a bag-backed token so that the
//! subscription that is currently live (the normal one, a pending retry, an active recovery)
//! can change behind one externally visible handle.
//!
//! A [`SerialToken`] holds at most one child. Storing a new child releases the previous one,
//! so a long-lived observation that schedules many retries keeps only the latest.

use crate::framework::sync::{Exclusive, ReentrantExclusive};
use std::fmt;
use std::sync::Arc;

type ReleaseAction = Box<dyn FnOnce() + Send>;

/// Single-fire disposable handle.
#[must_use = "dropping a CancellationToken releases it immediately"]
pub struct CancellationToken {
    action: Exclusive<Option<ReleaseAction>>,
}

impl CancellationToken {
    /// Creates a token that runs `on_release` the first time it is released.
    pub fn new(on_release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Exclusive::new(Some(Box::new(on_release))),
        }
    }

    /// Creates a token with no side effect.
    pub fn noop() -> Self {
        Self {
            action: Exclusive::new(None),
        }
    }

    /// Runs the release side effect if it has not run yet.
    ///
    /// The side effect runs on the calling thread, outside the token's own lock.
    pub fn release(&self) {
        let action = self.action.execute(|action| action.take());
        if let Some(action) = action {
            action();
        }
    }

    /// True once the side effect has run (always true for a no-op token).
    pub fn is_released(&self) -> bool {
        self.action.execute(|action| action.is_none())
    }

    /// Moves the token into `bag`, keeping it alive until the bag is released.
    pub fn store_in(self, bag: &TokenBag) {
        bag.push(self);
    }
}

impl Drop for CancellationToken {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("released", &self.is_released())
            .finish()
    }
}

impl From<TokenBag> for CancellationToken {
    fn from(bag: TokenBag) -> Self {
        CancellationToken::new(move || bag.release())
    }
}

#[derive(Default)]
struct BagState {
    tokens: Vec<CancellationToken>,
    released: bool,
}

/// A shared collection of tokens released together.
///
/// Cloning a bag yields another handle to the same collection. Dropping a handle does not
/// release anything; only [`TokenBag::release`] (or releasing a token built with
/// `CancellationToken::from(bag)`) does. Tokens pushed after the bag was released are released
/// on the spot.
#[derive(Clone, Default)]
pub struct TokenBag {
    inner: Arc<ReentrantExclusive<BagState>>,
}

impl TokenBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a token to the bag.
    pub fn push(&self, token: CancellationToken) {
        let rejected = self.inner.execute(|state| {
            let mut state = state.borrow_mut();
            if state.released {
                Some(token)
            } else {
                state.tokens.push(token);
                None
            }
        });

        if let Some(token) = rejected {
            token.release();
        }
    }

    /// Releases every token in the bag, in insertion order.
    ///
    /// A child whose side effect pushes into this same bag on the same thread re-enters the
    /// lock and sees the bag as released, so its token is released immediately as well.
    pub fn release(&self) {
        self.inner.execute(|state| {
            let tokens = {
                let mut state = state.borrow_mut();
                state.released = true;
                std::mem::take(&mut state.tokens)
            };
            for token in tokens {
                token.release();
            }
        });
    }

    pub fn is_released(&self) -> bool {
        self.inner.execute(|state| state.borrow().released)
    }

    pub fn len(&self) -> usize {
        self.inner.execute(|state| state.borrow().tokens.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TokenBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBag")
            .field("len", &self.len())
            .field("released", &self.is_released())
            .finish()
    }
}

#[derive(Default)]
struct SerialState {
    current: Option<CancellationToken>,
    released: bool,
}

/// A shared slot holding the one token that is currently live.
///
/// Cloning yields another handle to the same slot. After [`SerialToken::release`], tokens
/// stored into the slot are released on the spot.
#[derive(Clone, Default)]
pub struct SerialToken {
    inner: Arc<Exclusive<SerialState>>,
}

impl SerialToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `token`, releasing the one it replaces.
    pub fn replace(&self, token: CancellationToken) {
        let previous = self.inner.execute(|state| {
            if state.released {
                Some(token)
            } else {
                state.current.replace(token)
            }
        });

        if let Some(previous) = previous {
            previous.release();
        }
    }

    /// Releases the current token, leaving the slot usable.
    pub fn clear(&self) {
        if let Some(current) = self.inner.execute(|state| state.current.take()) {
            current.release();
        }
    }

    /// Releases the current token and every token stored from now on.
    pub fn release(&self) {
        let current = self.inner.execute(|state| {
            state.released = true;
            state.current.take()
        });
        if let Some(current) = current {
            current.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.inner.execute(|state| state.released)
    }

    /// True when no token is stored.
    pub fn is_empty(&self) -> bool {
        self.inner.execute(|state| state.current.is_none())
    }
}

impl fmt::Debug for SerialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialToken")
            .field("empty", &self.is_empty())
            .field("released", &self.is_released())
            .finish()
    }
}

impl From<SerialToken> for CancellationToken {
    fn from(slot: SerialToken) -> Self {
        CancellationToken::new(move || slot.release())
    }
}
