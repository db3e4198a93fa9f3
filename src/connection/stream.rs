//! Reply streams and subscription demultiplexing.
//!
//! Every call to [`Lighthouse::subscribe`] returns its own [`ReplyStream`],
//! but subscribers of the same path share one server-side `STREAM`. The
//! first subscriber opens it, later ones only attach locally, and the last
//! one to detach sends the `STOP`.

use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::{debug, warn};

use super::{Lighthouse, Shared, registry::Attach};
use crate::{
    codec::Codec,
    error::Result,
    protocol::{Path, Reply, RequestId, Verb},
    transport::Transport,
};

/// Which registration a [`ReplyStream`] holds.
#[derive(Debug)]
pub(crate) enum StreamKey {
    /// Consumer registered directly for a request id.
    Raw(RequestId),
    /// Subscriber of the shared subscription for a path.
    Subscriber { path: Path, id: RequestId },
}

/// A `STOP` owed to the server once the last subscriber left.
#[derive(Debug)]
pub(crate) struct PendingStop {
    pub(crate) path: Path,
    pub(crate) origin: RequestId,
}

/// Connection side of a [`ReplyStream`].
#[async_trait]
pub(crate) trait Release: Send + Sync {
    /// Drop the registration behind `key`.
    fn release(&self, key: &StreamKey) -> Option<PendingStop>;

    /// Tell the server to stop a subscription.
    async fn stop(&self, stop: PendingStop) -> Result<()>;
}

struct Lease {
    owner: Arc<dyn Release>,
    key: StreamKey,
}

/// Replies pushed for one request or subscription.
///
/// The stream yields `Ok(reply)` for every success reply in arrival order.
/// It yields one `Err` and then ends when the server answers with an error
/// status, when the connection is closed, or when the link fails.
///
/// Dropping the stream detaches it. When it was the last subscriber of its
/// path the `STOP` is sent from a task spawned on the current tokio runtime;
/// use [`detach`](Self::detach) to send it in place and observe the outcome.
///
/// # Examples
///
/// ```no_run
/// use futures::StreamExt;
/// use nighthouse::{Auth, Lighthouse, transport::WebSocketTransport};
///
/// # #[tokio::main]
/// # async fn main() -> nighthouse::Result<()> {
/// let transport = WebSocketTransport::connect("wss://lighthouse.uni-kiel.de/websocket");
/// let lh = Lighthouse::new(Auth::new("alice", "API-TOKEN"), transport);
/// let mut stream = lh.stream_model().await?;
/// while let Some(reply) = stream.next().await {
///     println!("{:?}", reply?.payload);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ReplyStream {
    id: RequestId,
    rx: mpsc::UnboundedReceiver<Result<Reply>>,
    lease: Option<Lease>,
}

impl ReplyStream {
    pub(crate) fn new(
        id: RequestId,
        rx: mpsc::UnboundedReceiver<Result<Reply>>,
        owner: Arc<dyn Release>,
        key: StreamKey,
    ) -> Self {
        Self {
            id,
            rx,
            lease: Some(Lease { owner, key }),
        }
    }

    /// The request id this stream is registered under.
    ///
    /// For a subscriber that joined an existing subscription this is a local
    /// id that never went over the wire.
    #[must_use]
    pub fn id(&self) -> RequestId { self.id }

    /// The subscribed path, or `None` for a stream obtained through
    /// [`Lighthouse::receive_stream`].
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self.lease.as_ref().map(|lease| &lease.key) {
            Some(StreamKey::Subscriber { path, .. }) => Some(path),
            _ => None,
        }
    }

    /// Detach from the subscription.
    ///
    /// Sends `STOP` and waits for the server's answer when this was the last
    /// subscriber of the path; otherwise returns immediately.
    ///
    /// # Errors
    ///
    /// Returns the error of the `STOP` request.
    pub async fn detach(mut self) -> Result<()> {
        let Some(lease) = self.lease.take() else {
            return Ok(());
        };
        match lease.owner.release(&lease.key) {
            Some(stop) => lease.owner.stop(stop).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ReplyStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyStream")
            .field("id", &self.id)
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}

impl Stream for ReplyStream {
    type Item = Result<Reply>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for ReplyStream {
    fn drop(&mut self) {
        let Some(lease) = self.lease.take() else {
            return;
        };
        let Some(stop) = lease.owner.release(&lease.key) else {
            return;
        };
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let path = stop.path.clone();
                    if let Err(e) = lease.owner.stop(stop).await {
                        debug!(%path, error = %e, "STOP for dropped stream failed");
                    }
                });
            }
            Err(_) => {
                warn!(path = %stop.path, "stream dropped outside a runtime; STOP not sent");
            }
        }
    }
}

#[async_trait]
impl<T, C> Release for Shared<T, C>
where
    T: Transport,
    C: Codec,
{
    fn release(&self, key: &StreamKey) -> Option<PendingStop> {
        let mut registry = self.registry();
        match key {
            StreamKey::Raw(id) => {
                registry.release_stream(*id);
                None
            }
            StreamKey::Subscriber { path, id } => {
                let origin = registry.detach(path, *id)?;
                if registry.is_closed() {
                    return None;
                }
                Some(PendingStop {
                    path: path.clone(),
                    origin,
                })
            }
        }
    }

    async fn stop(&self, stop: PendingStop) -> Result<()> {
        let result = self.call(Verb::Stop, stop.path, &super::verbs::empty_payload()).await;
        self.registry().forget_detached(stop.origin);
        result.map(drop)
    }
}

impl<T, C> Lighthouse<T, C>
where
    T: Transport,
    C: Codec,
{
    /// Subscribe to `path`.
    ///
    /// The first subscriber of a path sends `STREAM` with `payload`; later
    /// subscribers attach to the running subscription without network
    /// traffic and their payload is not sent. A joining subscriber first
    /// receives the most recent replies of the subscription, up to
    /// [`ReplayConfig::max_per_id`](crate::ReplayConfig::max_per_id) of them,
    /// and then every new one, so all subscribers observe the same sequence.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Closed`](crate::LighthouseError::Closed)
    /// on a closed connection, [`LighthouseError::Encode`](crate::LighthouseError::Encode)
    /// if `payload` cannot be encoded, or the transport error if `STREAM`
    /// could not be sent.
    pub async fn subscribe<P>(&self, path: impl Into<Path>, payload: &P) -> Result<ReplyStream>
    where
        P: Serialize + ?Sized,
    {
        let path = path.into();
        let shared = &self.shared;
        shared.ensure_open()?;
        let id = shared.next_id();
        let message = shared.encode(id, Verb::Stream, &path, payload)?;
        let (sink, rx) = mpsc::unbounded_channel();
        let attached = shared.registry().attach(&path, id, sink)?;
        let owner: Arc<dyn Release> = shared.clone();
        let stream = ReplyStream::new(
            id,
            rx,
            owner,
            StreamKey::Subscriber {
                path: path.clone(),
                id,
            },
        );
        if attached == Attach::Opened {
            if let Err(err) = shared.transmit(id, Verb::Stream, &path, message).await {
                let mut registry = shared.registry();
                if let Some(rejection) = registry.rejection(id) {
                    return Err(rejection);
                }
                registry.abort_subscription(&path, id, &err);
                return Err(err);
            }
        }
        Ok(stream)
    }

    /// Consume every reply sent for `id` as a stream.
    ///
    /// Replies that arrived before this call are yielded first. The stream
    /// is not shared: it receives the replies of exactly this id.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Closed`](crate::LighthouseError::Closed)
    /// on a closed connection or
    /// [`LighthouseError::Busy`](crate::LighthouseError::Busy) if another
    /// consumer is registered for `id`.
    pub fn receive_stream(&self, id: RequestId) -> Result<ReplyStream> {
        let (sink, rx) = mpsc::unbounded_channel();
        self.shared.registry().expect_stream(id, sink)?;
        let owner: Arc<dyn Release> = self.shared.clone();
        Ok(ReplyStream::new(id, rx, owner, StreamKey::Raw(id)))
    }
}
