//! Incoming replies.

use std::sync::Arc;

use rmpv::Value;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::RequestId;
use crate::error::CodecError;

const STATUS_KEY: &str = "RNUM";
const PAYLOAD_KEY: &str = "PAYL";

/// A message sent from the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// HTTP-like status code.
    #[serde(rename = "RNUM")]
    pub status: u16,
    /// Identifier of the request this reply answers; absent for unsolicited
    /// messages.
    #[serde(rename = "REID", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Human-readable status text.
    #[serde(rename = "RESPONSE", default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Non-fatal warnings attached by the server.
    #[serde(rename = "WARNINGS", default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    /// Verb-specific payload.
    #[serde(rename = "PAYL")]
    pub payload: Value,
}

/// A decoded value that does not have the shape of a [`Reply`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum MalformedMessage {
    /// The value is not a map containing both a status and a payload.
    #[error("message is not a map with RNUM and PAYL keys")]
    NotAReply,
    /// The value has the right keys but their contents do not fit.
    #[error("reply fields have unexpected types: {0}")]
    InvalidFields(#[source] Arc<rmpv::ext::Error>),
}

impl Reply {
    /// Build a reply with a status and payload.
    #[must_use]
    pub fn new(status: u16, payload: impl Into<Value>) -> Self {
        Self {
            status,
            id: None,
            message: None,
            warnings: Vec::new(),
            payload: payload.into(),
        }
    }

    /// Attach the request identifier this reply answers.
    #[must_use]
    pub fn with_id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach status text.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Recognize a decoded wire value as a reply.
    ///
    /// A value is a reply iff it is a map holding both `RNUM` and `PAYL`.
    ///
    /// # Errors
    ///
    /// Returns [`MalformedMessage`] for any other shape.
    pub fn from_value(value: Value) -> Result<Self, MalformedMessage> {
        let is_reply = value.as_map().is_some_and(|map| {
            let has = |key: &str| map.iter().any(|(k, _)| k.as_str() == Some(key));
            has(STATUS_KEY) && has(PAYLOAD_KEY)
        });
        if !is_reply {
            return Err(MalformedMessage::NotAReply);
        }
        rmpv::ext::from_value(value).map_err(|e| MalformedMessage::InvalidFields(Arc::new(e)))
    }

    /// Returns `true` if the status lies in `200..300`.
    #[must_use]
    pub fn is_success(&self) -> bool { (200..300).contains(&self.status) }

    /// Deserialize the payload into a typed value.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the payload does not describe a `T`.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        rmpv::ext::from_value(self.payload.clone()).map_err(|e| CodecError::Decode(Arc::new(e)))
    }
}
