//! Outgoing requests.

use std::collections::BTreeMap;

use rmpv::Value;
use serde::{Deserialize, Serialize};

use super::{Auth, Path, Verb};

/// Identifier correlating a request with its replies.
///
/// Identifiers are allocated per connection from a counter that only grows,
/// so they never repeat while the connection is open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw identifier.
    #[must_use]
    pub const fn new(id: u64) -> Self { Self(id) }

    /// Return the inner `u64` representation.
    #[must_use]
    pub const fn as_u64(self) -> u64 { self.0 }
}

impl From<u64> for RequestId {
    fn from(value: u64) -> Self { Self(value) }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.fmt(f) }
}

/// A message sent from the client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request<P> {
    /// Request identifier echoed back by the server.
    #[serde(rename = "REID")]
    pub id: RequestId,
    /// Caller credentials.
    #[serde(rename = "AUTH")]
    pub auth: Auth,
    /// Operation kind.
    #[serde(rename = "VERB")]
    pub verb: Verb,
    /// Addressed resource.
    #[serde(rename = "PATH")]
    pub path: Path,
    /// Request metadata; always sent, usually empty.
    #[serde(rename = "META")]
    pub meta: BTreeMap<String, Value>,
    /// Verb-specific payload.
    #[serde(rename = "PAYL")]
    pub payload: P,
}

impl<P> Request<P> {
    /// Build a request with empty metadata.
    pub fn new(id: RequestId, auth: Auth, verb: Verb, path: Path, payload: P) -> Self {
        Self {
            id,
            auth,
            verb,
            path,
            meta: BTreeMap::new(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, MessagePackCodec};

    #[test]
    fn request_uses_upper_case_wire_keys() {
        let request = Request::new(
            RequestId::new(4),
            Auth::new("alice", "token"),
            Verb::Get,
            Path::from(["hello"]),
            Value::Map(vec![]),
        );
        let bytes = MessagePackCodec.encode(&request).expect("encode request");
        let value: Value = MessagePackCodec.decode(&bytes).expect("decode as value");
        let map = value.as_map().expect("request encodes as a map");
        let field = |key: &str| {
            map.iter()
                .find(|(k, _)| k.as_str() == Some(key))
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| panic!("missing {key}"))
        };
        assert_eq!(field("REID"), Value::from(4));
        assert_eq!(field("VERB"), Value::from("GET"));
        assert_eq!(field("PATH"), Value::Array(vec![Value::from("hello")]));
        assert_eq!(field("META"), Value::Map(vec![]));
        assert_eq!(
            field("AUTH"),
            Value::Map(vec![
                (Value::from("USER"), Value::from("alice")),
                (Value::from("TOKEN"), Value::from("token")),
            ])
        );
    }
}
