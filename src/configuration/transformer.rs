//! # Transformers
//!
//! A [`Transformer`] maps an optional response body to a downstream type. Configurations use
//! one for values and one for domain errors.
//!
//! - [`BlockTransformer`]: wraps a closure; a missing body is [`MapError::MissingData`].
//! - [`EmptyTransformer`]: always signals [`MapError::GracefulEmpty`].
//! - [`JsonTransformer`]: decodes JSON with `serde_json`.

use crate::framework::MapError;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

pub trait Transformer: Send + Sync {
    type Output;

    fn transform(&self, input: Option<&[u8]>) -> Result<Self::Output, MapError>;
}

type Block<O> = Arc<dyn Fn(&[u8]) -> Result<O, MapError> + Send + Sync>;

/// Transformer backed by a closure.
pub struct BlockTransformer<O> {
    block: Block<O>,
}

impl<O> BlockTransformer<O> {
    pub fn new(block: impl Fn(&[u8]) -> Result<O, MapError> + Send + Sync + 'static) -> Self {
        Self {
            block: Arc::new(block),
        }
    }
}

impl<O> Clone for BlockTransformer<O> {
    fn clone(&self) -> Self {
        Self {
            block: Arc::clone(&self.block),
        }
    }
}

impl<O> Transformer for BlockTransformer<O> {
    type Output = O;

    fn transform(&self, input: Option<&[u8]>) -> Result<O, MapError> {
        let input = input.ok_or(MapError::MissingData)?;
        (self.block)(input)
    }
}

/// Transformer that always declines.
pub struct EmptyTransformer<O>(PhantomData<fn() -> O>);

impl<O> EmptyTransformer<O> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<O> Default for EmptyTransformer<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for EmptyTransformer<O> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<O> Transformer for EmptyTransformer<O> {
    type Output = O;

    fn transform(&self, _input: Option<&[u8]>) -> Result<O, MapError> {
        Err(MapError::GracefulEmpty)
    }
}

/// Transformer decoding a JSON body.
pub struct JsonTransformer<O>(PhantomData<fn() -> O>);

impl<O> JsonTransformer<O> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<O> Default for JsonTransformer<O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for JsonTransformer<O> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<O: DeserializeOwned> Transformer for JsonTransformer<O> {
    type Output = O;

    fn transform(&self, input: Option<&[u8]>) -> Result<O, MapError> {
        let input = input.ok_or(MapError::MissingData)?;
        Ok(serde_json::from_slice(input)?)
    }
}

impl<O> fmt::Debug for JsonTransformer<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = std::any::type_name::<O>()
            .split("::")
            .last()
            .unwrap_or("Unknown");
        write!(f, "JsonTransformer<{target}>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Repo {
        name: String,
        stars: u32,
    }

    #[test]
    fn test_block_transformer() {
        let upper = BlockTransformer::new(|bytes| {
            std::str::from_utf8(bytes)
                .map(str::to_uppercase)
                .map_err(|e| MapError::Custom(e.to_string()))
        });

        assert_eq!(upper.transform(Some(b"dominion")).unwrap(), "DOMINION");
        assert!(matches!(upper.transform(None), Err(MapError::MissingData)));
        assert!(matches!(
            upper.transform(Some(&[0xff, 0xfe])),
            Err(MapError::Custom(_))
        ));
    }

    #[test]
    fn test_empty_transformer_always_declines() {
        let empty = EmptyTransformer::<u32>::new();
        assert!(matches!(empty.transform(Some(b"42")), Err(MapError::GracefulEmpty)));
        assert!(matches!(empty.transform(None), Err(MapError::GracefulEmpty)));
    }

    #[test]
    fn test_json_transformer() {
        let json = JsonTransformer::<Repo>::new();
        let repo = json
            .transform(Some(br#"{"name":"engine","stars":12}"#))
            .unwrap();
        assert_eq!(
            repo,
            Repo {
                name: "engine".into(),
                stars: 12
            }
        );

        assert!(matches!(json.transform(Some(b"{")), Err(MapError::Decode(_))));
        assert!(matches!(json.transform(None), Err(MapError::MissingData)));
        assert_eq!(format!("{json:?}"), "JsonTransformer<Repo>");
    }
}
