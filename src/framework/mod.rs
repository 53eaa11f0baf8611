//! Generic fetch-and-cache framework.
//!
//! This module provides the building blocks every resource is made of: the state machine
//! itself, the observers it fans out to, and the tokens that keep an observation alive.
//!
//! # Main Components
//!
//! - [`Resource`] - The fetch-and-cache state machine for one configuration
//! - [`Observable`] - The capability shared by resources and decorators
//! - [`Observer`] / [`ExecutionContext`] - A callback and the serial context it runs on
//! - [`CancellationToken`] / [`TokenBag`] - Disposable observation handles
//! - [`Response`] / [`ResourceState`] - What a fetch produces and what a resource remembers
//! - [`FetchError`] / [`MapError`] - Raw failures and mapper outcomes
//! - [`Exclusive`] - The mutual-exclusion executor guarding shared state
//!
//! # Testing
//!
//! See [`mock`] module for a scripted transport and result recorders.

mod error;
pub mod mock;
mod observable;
mod observer;
mod resource;
mod response;
mod sync;
mod token;

pub use error::{FetchError, MapError, SharedError};
pub use observable::{Observable, ResultOf};
pub use observer::{Callback, ExecutionContext, Observer, ObserverId};
pub use resource::Resource;
pub use response::{is_success, FetchResult, ResourceState, Response};
pub use sync::{Exclusive, ReentrantExclusive};
pub use token::{CancellationToken, SerialToken, TokenBag};
