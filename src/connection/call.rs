//! Single-shot request correlation.

use serde::Serialize;

use super::{Lighthouse, Shared};
use crate::{
    codec::Codec,
    error::Result,
    protocol::{Path, Reply, RequestId, Verb},
    transport::Transport,
};

impl<T, C> Shared<T, C>
where
    T: Transport,
    C: Codec,
{
    pub(crate) async fn call<P>(&self, verb: Verb, path: Path, payload: &P) -> Result<Reply>
    where
        P: Serialize + ?Sized,
    {
        self.ensure_open()?;
        let id = self.next_id();
        let message = self.encode(id, verb, &path, payload)?;
        let settlement = self.registry().expect_reply(id)?;
        if let Err(err) = self.transmit(id, verb, &path, message).await {
            let mut registry = self.registry();
            if !registry.is_closed() {
                registry.abandon(id);
                return Err(err);
            }
            // Shutdown already rejected the settlement with its own cause.
        }
        settlement.await
    }
}

impl<T, C> Lighthouse<T, C>
where
    T: Transport,
    C: Codec,
{
    /// Send a request and wait for its reply.
    ///
    /// The reply is matched by request id, so concurrent calls may complete
    /// in any order.
    ///
    /// # Errors
    ///
    /// - [`LighthouseError::Response`](crate::LighthouseError::Response) if
    ///   the server answers with a status outside `200..300`.
    /// - [`LighthouseError::Closed`](crate::LighthouseError::Closed) if the
    ///   connection is closed before or while the call is pending. Nothing
    ///   is sent on a closed connection.
    /// - [`LighthouseError::Transport`](crate::LighthouseError::Transport)
    ///   if sending fails or the link breaks while waiting.
    /// - [`LighthouseError::Encode`](crate::LighthouseError::Encode) if
    ///   `payload` cannot be encoded.
    ///
    /// # Examples
    ///
    /// ```
    /// use nighthouse::{Auth, Lighthouse, Verb, transport::MemoryTransport};
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (transport, _peer) = MemoryTransport::pair();
    /// let lh = Lighthouse::new(Auth::new("alice", "token"), transport);
    /// lh.close().await.expect("close");
    /// let err = lh.call(Verb::Get, ["hello"], &()).await.expect_err("closed");
    /// assert!(err.is_closed());
    /// # }
    /// ```
    pub async fn call<P>(&self, verb: Verb, path: impl Into<Path>, payload: &P) -> Result<Reply>
    where
        P: Serialize + ?Sized,
    {
        self.shared.call(verb, path.into(), payload).await
    }

    /// Send a request without waiting for its reply.
    ///
    /// Returns the allocated request id; replies for it are buffered until
    /// [`receive`](Self::receive) or
    /// [`receive_stream`](Self::receive_stream) claims them.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Closed`](crate::LighthouseError::Closed),
    /// [`LighthouseError::Encode`](crate::LighthouseError::Encode) or the
    /// transport error, as for [`call`](Self::call).
    pub async fn send_request<P>(&self, verb: Verb, path: impl Into<Path>, payload: &P) -> Result<RequestId>
    where
        P: Serialize + ?Sized,
    {
        let path = path.into();
        let shared = &self.shared;
        shared.ensure_open()?;
        let id = shared.next_id();
        let message = shared.encode(id, verb, &path, payload)?;
        if let Err(err) = shared.transmit(id, verb, &path, message).await {
            return Err(shared.registry().rejection(id).unwrap_or(err));
        }
        Ok(id)
    }

    /// Wait for the next reply to `id`.
    ///
    /// A reply that arrived earlier is returned immediately.
    ///
    /// # Errors
    ///
    /// Returns [`LighthouseError::Response`](crate::LighthouseError::Response)
    /// for an error status,
    /// [`LighthouseError::Closed`](crate::LighthouseError::Closed) on a
    /// closed connection and [`LighthouseError::Busy`](crate::LighthouseError::Busy)
    /// if another consumer is registered for `id`.
    pub async fn receive(&self, id: RequestId) -> Result<Reply> {
        let settlement = self.shared.registry().expect_reply(id)?;
        settlement.await
    }
}
