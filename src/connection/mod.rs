//! Connection to a Lighthouse server.
//!
//! A [`Lighthouse`] owns one [`Transport`] and correlates everything that
//! comes back over it. Single-shot requests resolve through
//! [`Lighthouse::call`], subscriptions through [`Lighthouse::subscribe`], and
//! replies that race ahead of their consumer wait in a bounded replay buffer.
//! [`Lighthouse::close`] fails everything still pending.

use std::sync::{
    Arc,
    Mutex,
    MutexGuard,
    PoisonError,
    Weak,
    atomic::{AtomicU64, Ordering},
};

use bytes::Bytes;
use rmpv::Value;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    codec::{Codec, MessagePackCodec},
    config::ReplayConfig,
    error::{LighthouseError, Result, TransportError},
    metrics,
    protocol::{Auth, Path, Reply, Request, RequestId, Verb},
    transport::{Inbound, Transport},
};

mod call;
mod registry;
mod replay;
mod stream;
mod verbs;

pub use stream::ReplyStream;
use registry::Registry;

/// Client connection to a Lighthouse server.
///
/// The handle is cheap to clone; clones share the connection. All operations
/// take `&self` and may run concurrently from any number of tasks.
///
/// # Examples
///
/// ```no_run
/// use nighthouse::{Auth, Lighthouse, transport::WebSocketTransport};
///
/// # #[tokio::main]
/// # async fn main() -> nighthouse::Result<()> {
/// let transport = WebSocketTransport::connect("wss://lighthouse.uni-kiel.de/websocket");
/// let lh = Lighthouse::new(Auth::new("alice", "API-TOKEN"), transport);
/// lh.ready().await?;
/// let reply = lh.get(["hello"]).await?;
/// println!("{:?}", reply.payload);
/// lh.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct Lighthouse<T, C = MessagePackCodec> {
    shared: Arc<Shared<T, C>>,
}

/// State shared by every handle and stream of one connection.
pub(crate) struct Shared<T, C> {
    auth: Auth,
    transport: T,
    codec: C,
    /// Source of request ids; the first request is `1`.
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl<T, C> Clone for Lighthouse<T, C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T, C> std::fmt::Debug for Lighthouse<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lighthouse")
            .field("auth", &self.shared.auth)
            .field("next_id", &self.shared.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Lighthouse<T> {
    /// Bind a connection to `transport` using the MessagePack codec.
    ///
    /// The transport may still be connecting; requests wait for it.
    #[must_use]
    pub fn new(auth: Auth, transport: T) -> Self {
        Self::with_parts(auth, transport, MessagePackCodec, ReplayConfig::default())
    }
}

impl<T, C> Lighthouse<T, C>
where
    T: Transport,
    C: Codec,
{
    /// Bind a connection with an explicit codec and replay configuration.
    ///
    /// Registers the connection as the transport's receive handler.
    #[must_use]
    pub fn with_parts(auth: Auth, transport: T, codec: C, replay: ReplayConfig) -> Self {
        let shared = Arc::new(Shared {
            auth,
            transport,
            codec,
            next_id: AtomicU64::new(1),
            registry: Mutex::new(Registry::new(replay)),
        });
        let weak: Weak<Shared<T, C>> = Arc::downgrade(&shared);
        shared.transport.on_receive(Arc::new(move |inbound: Inbound| {
            if let Some(shared) = weak.upgrade() {
                shared.handle(inbound);
            }
        }));
        Self { shared }
    }

    /// The credentials attached to every request.
    #[must_use]
    pub fn auth(&self) -> &Auth { &self.shared.auth }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T { &self.shared.transport }

    /// Wait until the transport is connected.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Transport`] if the link cannot be
    /// established.
    pub async fn ready(&self) -> Result<()> {
        self.shared.transport.ready().await.map_err(Into::into)
    }

    /// Returns `true` once the connection was closed or its link failed.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.shared.registry().is_closed() }

    /// Close the connection.
    ///
    /// Every pending call fails with [`LighthouseError::Closed`], every
    /// stream yields that error and ends, and buffered replies are
    /// discarded before the transport is closed. Closing again does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Transport`] if the transport fails to
    /// close cleanly. The connection counts as closed either way.
    pub async fn close(&self) -> Result<()> {
        let first = self.shared.registry().shutdown(None);
        if !first {
            debug!("connection already closed");
            return Ok(());
        }
        info!(user = %self.shared.auth.user, "closing connection");
        self.shared.transport.close().await.map_err(Into::into)
    }
}

impl<T, C> Shared<T, C>
where
    T: Transport,
    C: Codec,
{
    pub(crate) fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_id(&self) -> RequestId {
        RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.registry().is_closed() {
            return Err(LighthouseError::Closed { request_id: None });
        }
        Ok(())
    }

    pub(crate) fn encode<P>(&self, id: RequestId, verb: Verb, path: &Path, payload: &P) -> Result<Bytes>
    where
        P: Serialize + ?Sized,
    {
        let request = Request::new(id, self.auth.clone(), verb, path.clone(), payload);
        self.codec
            .encode(&request)
            .map(Bytes::from)
            .map_err(LighthouseError::Encode)
    }

    pub(crate) async fn transmit(&self, id: RequestId, verb: Verb, path: &Path, message: Bytes) -> Result<()> {
        debug!(request_id = %id, %verb, %path, bytes = message.len(), "sending request");
        self.transport.send(message).await?;
        metrics::inc_requests(verb);
        Ok(())
    }

    fn handle(&self, inbound: Inbound) {
        match inbound {
            Ok(bytes) => self.dispatch(&bytes),
            Err(error) => self.fail(error),
        }
    }

    fn dispatch(&self, bytes: &[u8]) {
        let value: Value = match self.codec.decode(bytes) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, bytes = bytes.len(), "discarding undecodable message");
                metrics::inc_malformed();
                return;
            }
        };
        let reply = match Reply::from_value(value) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "discarding message that is not a reply");
                metrics::inc_malformed();
                return;
            }
        };
        debug!(request_id = ?reply.id, status = reply.status, "received reply");
        if !reply.warnings.is_empty() {
            warn!(request_id = ?reply.id, warnings = ?reply.warnings, "server sent warnings");
        }
        let outcome = self.registry().route(reply);
        metrics::inc_replies(outcome);
    }

    /// Fail everything pending after the link broke.
    fn fail(&self, error: TransportError) {
        let first = self.registry().shutdown(Some(error.clone()));
        if first {
            warn!(error = %error, "link failed; connection closed");
        } else {
            debug!(error = %error, "link failure after close");
        }
    }
}
