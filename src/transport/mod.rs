//! Byte-stream transports carrying encoded messages.
//!
//! A [`Transport`] moves whole messages: one call to [`Transport::send`] is
//! one message on the wire, and the registered [`ReceiveHandler`] is invoked
//! once per inbound message. Framing is the transport's concern.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

mod memory;
mod websocket;

pub use memory::{MemoryPeer, MemoryTransport};
pub use websocket::WebSocketTransport;

/// Inbound event delivered to a [`ReceiveHandler`].
///
/// `Ok` carries one raw message. `Err` reports that the link failed; it is
/// delivered at most once and no messages follow it.
pub type Inbound = Result<Bytes, TransportError>;

/// Callback invoked by a transport for every inbound event.
///
/// Handlers run synchronously on whatever task the transport reads on and
/// must not block.
pub type ReceiveHandler = Arc<dyn Fn(Inbound) + Send + Sync + 'static>;

/// A bidirectional message link to the server.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Hand one message to the network.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the link is down or the write fails.
    async fn send(&self, message: Bytes) -> Result<(), TransportError>;

    /// Wait until the link is established.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the link cannot be established.
    async fn ready(&self) -> Result<(), TransportError>;

    /// Register the receive handler.
    ///
    /// A transport holds exactly one handler; registering again replaces it.
    /// Messages that arrived before the first registration are delivered to
    /// the handler as soon as it is registered.
    fn on_receive(&self, handler: ReceiveHandler);

    /// Terminate the link. Closing twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the close handshake fails.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Handler slot shared by the bundled transports.
///
/// Buffers inbound events until a handler is registered, then forwards
/// directly.
#[derive(Default)]
pub(crate) struct HandlerSlot {
    inner: std::sync::Mutex<SlotState>,
}

#[derive(Default)]
struct SlotState {
    handler: Option<ReceiveHandler>,
    backlog: Vec<Inbound>,
}

impl HandlerSlot {
    fn lock(&self) -> std::sync::MutexGuard<'_, SlotState> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Install `handler` and flush any backlog into it.
    ///
    /// Delivery happens under the slot lock so the backlog cannot be
    /// overtaken by a concurrent [`deliver`](Self::deliver).
    pub(crate) fn set(&self, handler: ReceiveHandler) {
        let mut state = self.lock();
        for inbound in std::mem::take(&mut state.backlog) {
            handler(inbound);
        }
        state.handler = Some(handler);
    }

    /// Deliver one inbound event, buffering it if no handler is registered.
    pub(crate) fn deliver(&self, inbound: Inbound) {
        let mut guard = self.lock();
        let state = &mut *guard;
        match &state.handler {
            Some(handler) => handler(inbound),
            None => state.backlog.push(inbound),
        }
    }
}
