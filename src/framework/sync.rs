//! # Mutual-Exclusion Executors
//!
//! Every piece of shared mutable state in the engine lives behind one of these executors.
//! A block of logic is handed to [`execute`](Exclusive::execute) and runs with exclusive
//! access to the guarded value.
//!
//! Two variants are offered, and the choice is made explicitly at the construction site:
//!
//! | Variant | Lock | Nested `execute` from the same thread |
//! |---------|------|----------------------------------------|
//! | [`Exclusive`] | `parking_lot::Mutex` | Deadlocks. Never call out while holding it. |
//! | [`ReentrantExclusive`] | `parking_lot::ReentrantMutex` | Allowed, as long as the outer block is not borrowing the value. |
//!
//! The resource state machine uses [`Exclusive`]: callbacks are always invoked after the block
//! has returned, so re-entrant calls from observers simply take the lock again.

use parking_lot::{Mutex, ReentrantMutex};
use std::cell::RefCell;

/// Plain (non-reentrant) exclusive executor.
#[derive(Debug, Default)]
pub struct Exclusive<T> {
    inner: Mutex<T>,
}

impl<T> Exclusive<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Runs `block` with exclusive access to the guarded value.
    ///
    /// The block must not call back into code that may `execute` on the same instance.
    pub fn execute<R>(&self, block: impl FnOnce(&mut T) -> R) -> R {
        let mut guard = self.inner.lock();
        block(&mut guard)
    }
}

/// Reentrant exclusive executor.
///
/// The block receives the value as a [`RefCell`], so it can release its borrow before calling
/// out to code that re-enters `execute` on the same thread. Other threads stay excluded for
/// the whole duration of the outermost block.
#[derive(Debug, Default)]
pub struct ReentrantExclusive<T> {
    inner: ReentrantMutex<RefCell<T>>,
}

impl<T> ReentrantExclusive<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(value)),
        }
    }

    /// Runs `block` while holding the reentrant lock.
    pub fn execute<R>(&self, block: impl FnOnce(&RefCell<T>) -> R) -> R {
        let guard = self.inner.lock();
        block(&guard)
    }
}
