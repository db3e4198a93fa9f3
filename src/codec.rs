//! Wire value serialization.
//!
//! The [`Codec`] trait lets applications plug in the binary object format
//! used on the wire. [`MessagePackCodec`] is the default and matches what the
//! Lighthouse server speaks.

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::CodecError;

/// Symmetric, lossless serialization of wire values.
///
/// # Object Safety
///
/// Like most serde-based traits, `Codec` is generic over the value type and
/// therefore not object-safe. Connections are generic over their codec
/// instead of boxing it.
pub trait Codec: Send + Sync + 'static {
    /// Encode `value` into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if the value cannot be represented.
    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized;

    /// Decode a value from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the bytes do not describe a `T`.
    fn decode<T>(&self, bytes: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned;
}

/// MessagePack codec backed by `rmp-serde`.
///
/// Structs are written as maps keyed by field name, which is the shape the
/// server expects for requests.
///
/// # Examples
///
/// ```
/// use nighthouse::codec::{Codec, MessagePackCodec};
///
/// let bytes = MessagePackCodec.encode(&("Hello", 42u8)).expect("encode");
/// let (text, n): (String, u8) = MessagePackCodec.decode(&bytes).expect("decode");
/// assert_eq!((text.as_str(), n), ("Hello", 42));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct MessagePackCodec;

impl Codec for MessagePackCodec {
    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized,
    {
        rmp_serde::to_vec_named(value).map_err(|e| CodecError::Encode(Arc::new(e)))
    }

    fn decode<T>(&self, bytes: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        rmp_serde::from_slice(bytes).map_err(|e| CodecError::Decode(Arc::new(e)))
    }
}
