//! In-process transport.
//!
//! [`MemoryTransport::pair`] returns the client end of a link together with a
//! [`MemoryPeer`] that plays the server: it reads what the client sent and
//! pushes raw replies back. Useful for tests and for embedding a server in the
//! same process.

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use super::{HandlerSlot, ReceiveHandler, Transport};
use crate::error::TransportError;

#[derive(Default)]
struct Link {
    slot: HandlerSlot,
    outbound: Mutex<Option<mpsc::UnboundedSender<Bytes>>>,
    ready_error: Mutex<Option<TransportError>>,
    closes: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Client end of an in-process link.
pub struct MemoryTransport {
    link: Arc<Link>,
}

/// Server end of an in-process link.
pub struct MemoryPeer {
    link: Arc<Link>,
    inbound: mpsc::UnboundedReceiver<Bytes>,
}

impl MemoryTransport {
    /// Create a connected transport and peer.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use nighthouse::transport::{MemoryTransport, Transport};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (transport, mut peer) = MemoryTransport::pair();
    /// transport.send(Bytes::from_static(b"ping")).await.expect("send");
    /// assert_eq!(peer.recv().await.as_deref(), Some(&b"ping"[..]));
    /// # }
    /// ```
    #[must_use]
    pub fn pair() -> (Self, MemoryPeer) {
        let (tx, rx) = mpsc::unbounded_channel();
        let link = Arc::new(Link {
            outbound: Mutex::new(Some(tx)),
            ..Link::default()
        });
        (
            Self { link: link.clone() },
            MemoryPeer { link, inbound: rx },
        )
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn send(&self, message: Bytes) -> Result<(), TransportError> {
        let outbound = lock(&self.link.outbound);
        let Some(tx) = outbound.as_ref() else {
            return Err(TransportError::Closed);
        };
        tx.send(message).map_err(|_| TransportError::Disconnected)
    }

    async fn ready(&self) -> Result<(), TransportError> {
        match lock(&self.link.ready_error).clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn on_receive(&self, handler: ReceiveHandler) { self.link.slot.set(handler); }

    async fn close(&self) -> Result<(), TransportError> {
        lock(&self.link.outbound).take();
        self.link.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl MemoryPeer {
    /// Receive the next message sent by the client.
    ///
    /// Returns `None` once the client closed the transport (or dropped it)
    /// and every sent message has been read.
    pub async fn recv(&mut self) -> Option<Bytes> { self.inbound.recv().await }

    /// Receive a message if one is already queued.
    pub fn try_recv(&mut self) -> Option<Bytes> { self.inbound.try_recv().ok() }

    /// Push a raw message to the client.
    pub fn send(&self, message: impl Into<Bytes>) { self.link.slot.deliver(Ok(message.into())); }

    /// Report a link failure to the client.
    pub fn fail(&self, error: TransportError) { self.link.slot.deliver(Err(error)); }

    /// Make subsequent [`Transport::ready`] calls fail with `error`.
    pub fn refuse_ready(&self, error: TransportError) {
        *lock(&self.link.ready_error) = Some(error);
    }

    /// Returns `true` once the client has closed the transport.
    #[must_use]
    pub fn is_closed(&self) -> bool { lock(&self.link.outbound).is_none() }

    /// Number of times the client called [`Transport::close`].
    #[must_use]
    pub fn close_count(&self) -> usize { self.link.closes.load(Ordering::SeqCst) }
}
