//! # Responses and Resource State
//!
//! [`Response`] is what a successful exchange turns into once the configuration's mappers have
//! run. [`ResourceState`] is what a [`Resource`](crate::framework::Resource) remembers between
//! fetches.

use crate::framework::error::FetchError;

/// The mapped outcome of an exchange. Exactly one variant is live at a time.
#[derive(Debug, Clone, PartialEq)]
pub enum Response<T, E> {
    /// The value mapper produced a value.
    Value(T),
    /// The exchange succeeded but the value mapper declined to map it.
    EmptyValue,
    /// The error mapper produced a domain error.
    Error(E),
    /// The exchange failed and the error mapper declined to map it. The original transport
    /// error is carried through.
    EmptyError(FetchError),
}

impl<T, E> Response<T, E> {
    /// The mapped value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Response::Value(value) => Some(value),
            Response::EmptyValue | Response::Error(_) | Response::EmptyError(_) => None,
        }
    }

    /// The mapped domain error, if any.
    pub fn error(&self) -> Option<&E> {
        match self {
            Response::Error(error) => Some(error),
            Response::Value(_) | Response::EmptyValue | Response::EmptyError(_) => None,
        }
    }

    /// True for `Value` and `EmptyValue`.
    pub fn is_success(&self) -> bool {
        matches!(self, Response::Value(_) | Response::EmptyValue)
    }
}

/// What every observer receives: a mapped response or a raw failure.
pub type FetchResult<T, E> = Result<Response<T, E>, FetchError>;

/// True when `result` carries a real value or a declined value.
///
/// Everything else (domain error, declined error, raw failure) is failure-like and is what
/// the retry and recovery decorators react to.
pub fn is_success<T, E>(result: &FetchResult<T, E>) -> bool {
    matches!(result, Ok(response) if response.is_success())
}

/// The state a resource remembers between fetches.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceState<T, E> {
    /// Nothing fetched yet.
    Initial,
    /// The last fetch produced a response.
    Data(Response<T, E>),
    /// The last fetch failed with a raw failure.
    Error(FetchError),
}

impl<T, E> ResourceState<T, E> {
    pub(crate) fn from_result(result: FetchResult<T, E>) -> Self {
        match result {
            Ok(response) => ResourceState::Data(response),
            Err(error) => ResourceState::Error(error),
        }
    }

    /// True when the state should stamp a fresh success timestamp.
    pub(crate) fn is_success(&self) -> bool {
        matches!(self, ResourceState::Data(response) if response.is_success())
    }
}
