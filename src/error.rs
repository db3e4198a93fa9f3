//! Canonical error types for the crate.
//!
//! [`LighthouseError`] is the single surface returned by connection
//! operations. Transport and codec failures are wrapped in dedicated enums so
//! callers can tell a dead link from a rejected request.
//!
//! All errors are [`Clone`]: a single failure (a closed connection, a broken
//! link, an error status on a shared stream) is delivered to every consumer
//! affected by it.

use std::sync::Arc;

use crate::{
    deferred::Abandoned,
    protocol::{Reply, RequestId},
};

/// Boxed source error shared between clones of a failure.
pub type SharedSource = Arc<dyn std::error::Error + Send + Sync>;

/// Errors reported by a [`Transport`](crate::transport::Transport).
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The link could not be established.
    #[error("failed to establish link: {0}")]
    Connect(#[source] SharedSource),
    /// An outbound message could not be handed to the network.
    #[error("failed to send message: {0}")]
    Send(#[source] SharedSource),
    /// The link failed while it was in use.
    #[error("link failed: {0}")]
    Link(#[source] SharedSource),
    /// The peer closed the link.
    #[error("link closed by peer")]
    Disconnected,
    /// The transport was closed locally.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// Wrap an arbitrary error as a connect failure.
    pub fn connect(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connect(Arc::new(error))
    }

    /// Wrap an arbitrary error as a send failure.
    pub fn send(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Send(Arc::new(error))
    }

    /// Wrap an arbitrary error as a mid-flight link failure.
    pub fn link(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Link(Arc::new(error))
    }
}

/// Errors raised while encoding or decoding wire values.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
    /// A value could not be encoded.
    #[error("failed to encode message: {0}")]
    Encode(#[source] SharedSource),
    /// Bytes could not be decoded.
    #[error("failed to decode message: {0}")]
    Decode(#[source] SharedSource),
}

/// Errors emitted by [`Lighthouse`](crate::Lighthouse) operations.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum LighthouseError {
    /// The underlying link failed to open, send or stay up.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    /// The server answered with a status outside `200..300`.
    #[error("got status {} for request {request_id}", .reply.status)]
    Response {
        /// Identifier of the request the reply belongs to.
        request_id: RequestId,
        /// The full offending reply.
        reply: Box<Reply>,
    },
    /// The connection is closed, or was closed while the request was pending.
    #[error("{}", closed_message(.request_id))]
    Closed {
        /// Identifier of the affected request, if one had been allocated.
        request_id: Option<RequestId>,
    },
    /// Another consumer is already registered for the request id.
    #[error("request {request_id} already has a consumer")]
    Busy {
        /// The contested request id.
        request_id: RequestId,
    },
    /// The request could not be encoded.
    #[error(transparent)]
    Encode(CodecError),
}

fn closed_message(request_id: &Option<RequestId>) -> String {
    match request_id {
        Some(id) => format!("connection closed before request {id} completed"),
        None => "connection closed".to_owned(),
    }
}

impl LighthouseError {
    pub(crate) fn closed(request_id: impl Into<Option<RequestId>>) -> Self {
        Self::Closed {
            request_id: request_id.into(),
        }
    }

    pub(crate) fn response(request_id: RequestId, reply: Reply) -> Self {
        Self::Response {
            request_id,
            reply: Box::new(reply),
        }
    }

    /// Returns `true` if this error stems from a closed connection.
    #[must_use]
    pub fn is_closed(&self) -> bool { matches!(self, Self::Closed { .. }) }

    /// Returns the error reply if the server rejected the request.
    #[must_use]
    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Self::Response { reply, .. } => Some(reply),
            _ => None,
        }
    }
}

impl From<Abandoned> for LighthouseError {
    fn from(_: Abandoned) -> Self { Self::Closed { request_id: None } }
}

/// Canonical result alias used by `nighthouse` public APIs.
pub type Result<T> = std::result::Result<T, LighthouseError>;
