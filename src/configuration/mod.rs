//! Resource configuration: *what* to fetch and how to interpret it.
//!
//! # Main Components
//!
//! - [`ResourceConfiguration`] - The contract every configuration implements
//! - [`Expiration`] - When cached data must be refetched
//! - [`Transformer`] - Body mappers ([`BlockTransformer`], [`EmptyTransformer`], [`JsonTransformer`])
//! - [`EndpointConfiguration`] - A configuration assembled from closures and transformers

mod endpoint;
mod expiration;
mod transformer;

pub use endpoint::EndpointConfiguration;
pub use expiration::Expiration;
pub use transformer::{BlockTransformer, EmptyTransformer, JsonTransformer, Transformer};

use crate::framework::{FetchError, MapError};

/// Immutable description of one logical fetch.
///
/// # Mapping contract
/// The mappers return [`MapError::GracefulEmpty`] to say "do not map this". The engine turns
/// that into `Response::EmptyValue` / `Response::EmptyError`. Any other `MapError` becomes a
/// raw [`FetchError::Mapping`] failure.
pub trait ResourceConfiguration: Clone + Send + Sync + 'static {
    /// The request handed to the provider.
    type Request: Send + 'static;

    /// The mapped value type.
    type Value: Clone + Send + Sync + 'static;

    /// The mapped domain error type.
    type Error: Clone + Send + Sync + 'static;

    /// Key under which a directory shares the resource. `None` means "never shared".
    fn cache_key(&self) -> Option<String>;

    fn expiration(&self) -> Expiration;

    /// A copy of this configuration that bypasses any transport-level cache.
    fn aggressive(&self) -> Self;

    /// Builds the request. A failure here never reaches the provider.
    fn build_request(&self) -> Result<Self::Request, FetchError>;

    fn map_value(&self, body: Option<&[u8]>) -> Result<Self::Value, MapError>;

    fn map_error(&self, body: Option<&[u8]>) -> Result<Self::Error, MapError>;
}
