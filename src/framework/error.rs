//! # Engine Errors
//!
//! This module defines the error types that flow through the engine. By centralizing the
//! taxonomy here, every layer (configuration, provider, resource, decorators) agrees on what a
//! raw failure looks like and how the mapper signals are told apart.
//!
//! Errors are fanned out to many observers, so they must be cheap to clone: foreign error
//! sources are shared behind an [`Arc`].

use std::sync::Arc;

/// A shared, type-erased error source.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// A raw failure of a fetch.
///
/// Raw failures never carry a mapped value. They reach observers as the `Err` side of a
/// [`FetchResult`](crate::framework::FetchResult) and are recorded as
/// [`ResourceState::Error`](crate::framework::ResourceState::Error).
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// The provider could not complete the exchange (network level).
    #[error("Transport failure: {0}")]
    Transport(SharedError),

    /// The provider returned a result with no recognizable success/failure outcome.
    #[error("Response carried no recognizable outcome")]
    InvalidResponse,

    /// A failure status arrived without any transport error attached.
    #[error("Unexpected status {0}")]
    UnexpectedStatus(u16),

    /// The value or error mapper failed with something other than a graceful empty.
    #[error("Mapping failed: {0}")]
    Mapping(MapError),

    /// The request could not be built from the configuration.
    #[error("Request could not be built: {0}")]
    Request(String),
}

impl FetchError {
    /// Wraps any error as a transport failure.
    pub fn transport(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        FetchError::Transport(Arc::new(error))
    }
}

// Sources are trait objects, so equality compares variants only.
impl PartialEq for FetchError {
    fn eq(&self, other: &Self) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

/// Outcome of a mapper that did not produce a value.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MapError {
    /// The caller explicitly does not want this mapped. Absorbed by the engine and turned into
    /// `Response::EmptyValue` / `Response::EmptyError`.
    #[error("Graceful empty")]
    GracefulEmpty,

    /// The mapper needed a body but none was received.
    #[error("Missing data")]
    MissingData,

    /// The body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(Arc<serde_json::Error>),

    /// Any other mapper failure.
    #[error("Custom mapping error: {0}")]
    Custom(String),
}

impl From<serde_json::Error> for MapError {
    fn from(error: serde_json::Error) -> Self {
        MapError::Decode(Arc::new(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("connection reset")]
    struct Reset;

    #[test]
    fn test_transport_error_keeps_source_message() {
        let error = FetchError::transport(Reset);
        assert_eq!(error.to_string(), "Transport failure: connection reset");

        let cloned = error.clone();
        assert!(matches!(cloned, FetchError::Transport(_)));
    }

    #[test]
    fn test_mapping_error_wraps_decode_failure() {
        let decode = serde_json::from_str::<u32>("not json").unwrap_err();
        let error = FetchError::Mapping(MapError::from(decode));
        assert!(error.to_string().starts_with("Mapping failed: Decode error"));
    }
}
