//! # Data Provider
//!
//! [`DataProvider`] drives a [`Transport`] on a tokio runtime and applies the configuration's
//! mappers to the raw [`TransportOutcome`].
//!
//! ## Outcome classification
//!
//! | Outcome | Mapper | Result |
//! |---------|--------|--------|
//! | status `200..300` | `map_value` ok | `Ok(Value)` |
//! | status `200..300` | graceful empty | `Ok(EmptyValue)` |
//! | other status | `map_error` ok | `Ok(Error)` |
//! | other status | graceful empty | `Ok(EmptyError(original))` |
//! | any status | other mapper failure | `Err(Mapping)` |
//! | no status | (none) | `Err(Transport)` or `Err(InvalidResponse)` |

use crate::configuration::ResourceConfiguration;
use crate::framework::{FetchError, FetchResult, MapError, Response, SharedError};
use crate::provider::task::{ResourceTask, SpawnedTask};
use crate::provider::{Completion, ResourceProvider};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

/// The raw result of one exchange.
#[derive(Debug, Clone, Default)]
pub struct TransportOutcome {
    pub status: Option<u16>,
    pub body: Option<Vec<u8>>,
    pub error: Option<SharedError>,
}

impl TransportOutcome {
    /// An exchange that completed with `status` and `body`.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Some(status),
            body: Some(body.into()),
            error: None,
        }
    }

    /// An exchange that never produced a status.
    pub fn unreachable(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            status: None,
            body: None,
            error: Some(Arc::new(error)),
        }
    }

    /// Attaches the transport error reported alongside a failure status.
    pub fn with_error(mut self, error: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(error));
        self
    }

    pub fn is_success_status(&self) -> bool {
        matches!(self.status, Some(status) if (200..300).contains(&status))
    }
}

/// Performs the raw exchange for a request.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Request: Send + 'static;

    async fn execute(&self, request: Self::Request) -> TransportOutcome;
}

/// Applies the mapping contract of `configuration` to a raw outcome.
pub fn map_outcome<C: ResourceConfiguration>(
    configuration: &C,
    outcome: TransportOutcome,
) -> FetchResult<C::Value, C::Error> {
    let success = outcome.is_success_status();
    let Some(status) = outcome.status else {
        return Err(outcome
            .error
            .map(FetchError::Transport)
            .unwrap_or(FetchError::InvalidResponse));
    };

    let body = outcome.body.as_deref();
    if success {
        match configuration.map_value(body) {
            Ok(value) => Ok(Response::Value(value)),
            Err(MapError::GracefulEmpty) => Ok(Response::EmptyValue),
            Err(error) => Err(FetchError::Mapping(error)),
        }
    } else {
        let original = outcome
            .error
            .clone()
            .map(FetchError::Transport)
            .unwrap_or(FetchError::UnexpectedStatus(status));
        match configuration.map_error(body) {
            Ok(error) => Ok(Response::Error(error)),
            Err(MapError::GracefulEmpty) => Ok(Response::EmptyError(original)),
            Err(error) => Err(FetchError::Mapping(error)),
        }
    }
}

/// A provider that runs a [`Transport`] on a tokio runtime.
pub struct DataProvider<T: Transport> {
    transport: Arc<T>,
    handle: Handle,
}

impl<T: Transport> DataProvider<T> {
    /// Creates a provider spawning on the current tokio runtime.
    ///
    /// # Panics
    /// When called outside a tokio runtime. Use [`DataProvider::with_handle`] otherwise.
    pub fn new(transport: Arc<T>) -> Self {
        Self::with_handle(transport, Handle::current())
    }

    pub fn with_handle(transport: Arc<T>, handle: Handle) -> Self {
        Self { transport, handle }
    }
}

impl<T: Transport> ResourceProvider for DataProvider<T> {
    type Request = T::Request;

    fn perform<C>(
        &self,
        request: T::Request,
        configuration: C,
        completion: Completion<C::Value, C::Error>,
    ) -> Arc<dyn ResourceTask>
    where
        C: ResourceConfiguration<Request = T::Request>,
    {
        let transport = Arc::clone(&self.transport);
        let future = async move {
            let outcome = transport.execute(request).await;
            debug!(status = ?outcome.status, "Transport outcome");
            completion(map_outcome(&configuration, outcome));
        };
        Arc::new(SpawnedTask::new(self.handle.clone(), Box::pin(future)))
    }
}
