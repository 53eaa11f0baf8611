//! # Endpoint Configuration
//!
//! [`EndpointConfiguration`] is a ready-made [`ResourceConfiguration`] assembled from parts:
//! a request builder, a value transformer, an error transformer, an optional cache key and an
//! expiration policy.
//!
//! The request builder receives the `aggressive` flag so that it can ask the transport to skip
//! its own cache (e.g. add a `Cache-Control: no-cache` header).

use crate::configuration::expiration::Expiration;
use crate::configuration::transformer::Transformer;
use crate::configuration::ResourceConfiguration;
use crate::framework::{FetchError, MapError};
use std::fmt;
use std::sync::Arc;

type RequestBuilder<R> = Arc<dyn Fn(bool) -> Result<R, FetchError> + Send + Sync>;

/// A configuration composed of closures and transformers.
pub struct EndpointConfiguration<R, V, E> {
    cache_key: Option<String>,
    expiration: Expiration,
    aggressive: bool,
    request: RequestBuilder<R>,
    value: Arc<dyn Transformer<Output = V>>,
    error: Arc<dyn Transformer<Output = E>>,
}

impl<R, V, E> EndpointConfiguration<R, V, E> {
    /// Creates a non-shared configuration that never expires.
    pub fn new(
        request: impl Fn(bool) -> Result<R, FetchError> + Send + Sync + 'static,
        value: impl Transformer<Output = V> + 'static,
        error: impl Transformer<Output = E> + 'static,
    ) -> Self {
        Self {
            cache_key: None,
            expiration: Expiration::Never,
            aggressive: false,
            request: Arc::new(request),
            value: Arc::new(value),
            error: Arc::new(error),
        }
    }

    /// Shares resources built from this configuration under `key`.
    pub fn with_cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    pub fn with_expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = expiration;
        self
    }

    /// True for the cache-bypassing variant.
    pub fn is_aggressive(&self) -> bool {
        self.aggressive
    }
}

impl<R, V, E> Clone for EndpointConfiguration<R, V, E> {
    fn clone(&self) -> Self {
        Self {
            cache_key: self.cache_key.clone(),
            expiration: self.expiration,
            aggressive: self.aggressive,
            request: Arc::clone(&self.request),
            value: Arc::clone(&self.value),
            error: Arc::clone(&self.error),
        }
    }
}

impl<R, V, E> fmt::Debug for EndpointConfiguration<R, V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointConfiguration")
            .field("cache_key", &self.cache_key)
            .field("expiration", &self.expiration)
            .field("aggressive", &self.aggressive)
            .finish_non_exhaustive()
    }
}

impl<R, V, E> ResourceConfiguration for EndpointConfiguration<R, V, E>
where
    R: Send + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Request = R;
    type Value = V;
    type Error = E;

    fn cache_key(&self) -> Option<String> {
        self.cache_key.clone()
    }

    fn expiration(&self) -> Expiration {
        self.expiration
    }

    fn aggressive(&self) -> Self {
        Self {
            aggressive: true,
            ..self.clone()
        }
    }

    fn build_request(&self) -> Result<R, FetchError> {
        (self.request)(self.aggressive)
    }

    fn map_value(&self, body: Option<&[u8]>) -> Result<V, MapError> {
        self.value.transform(body)
    }

    fn map_error(&self, body: Option<&[u8]>) -> Result<E, MapError> {
        self.error.transform(body)
    }
}
