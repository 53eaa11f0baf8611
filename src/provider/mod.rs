//! The provider boundary: who actually performs a fetch.
//!
//! A [`Resource`](crate::framework::Resource) builds the request from its configuration and
//! hands it to a [`ResourceProvider`], which returns a [`ResourceTask`] and later invokes the
//! completion with the mapped result.
//!
//! # Main Components
//!
//! - [`ResourceProvider`] - The contract a resource fetches through
//! - [`ResourceTask`] - The handle of one in-flight fetch ([`SpawnedTask`] for tokio)
//! - [`Transport`] / [`TransportOutcome`] - Raw exchange below the provider
//! - [`DataProvider`] - A provider driving a [`Transport`] on a tokio runtime
//! - [`map_outcome`] - The mapping contract from raw outcome to [`FetchResult`]

mod data_provider;
mod task;

pub use data_provider::{map_outcome, DataProvider, Transport, TransportOutcome};
pub use task::{ResourceTask, SpawnedTask};

use crate::configuration::ResourceConfiguration;
use crate::framework::FetchResult;
use std::sync::Arc;

/// Receives the result of one fetch. Called at most once, from any thread.
pub type Completion<T, E> = Box<dyn FnOnce(FetchResult<T, E>) + Send>;

/// Performs fetches for resources.
pub trait ResourceProvider: Send + Sync + 'static {
    /// The request type this provider understands.
    type Request: Send + 'static;

    /// Prepares a fetch for `request`. The returned task must not start before `resume`.
    ///
    /// `configuration` carries the mappers to apply to the raw outcome.
    fn perform<C>(
        &self,
        request: Self::Request,
        configuration: C,
        completion: Completion<C::Value, C::Error>,
    ) -> Arc<dyn ResourceTask>
    where
        C: ResourceConfiguration<Request = Self::Request>;
}
