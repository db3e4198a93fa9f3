//! One method per protocol verb.

use rmpv::Value;
use serde::Serialize;

use super::{Lighthouse, ReplyStream};
use crate::{
    codec::Codec,
    error::Result,
    protocol::{Path, Reply, Verb},
    transport::Transport,
};

/// Payload of requests that carry no data: an empty map.
pub(crate) fn empty_payload() -> Value { Value::Map(Vec::new()) }

impl<T, C> Lighthouse<T, C>
where
    T: Transport,
    C: Codec,
{
    /// Create a resource at `path` and write `payload` to it.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn post<P>(&self, path: impl Into<Path>, payload: &P) -> Result<Reply>
    where
        P: Serialize + ?Sized,
    {
        self.call(Verb::Post, path, payload).await
    }

    /// Write `payload` to the resource at `path`.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn put<P>(&self, path: impl Into<Path>, payload: &P) -> Result<Reply>
    where
        P: Serialize + ?Sized,
    {
        self.call(Verb::Put, path, payload).await
    }

    /// Create an empty resource at `path`.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn create(&self, path: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::Create, path, &empty_payload()).await
    }

    /// Delete the resource at `path`.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn delete(&self, path: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::Delete, path, &empty_payload()).await
    }

    /// Create a directory at `path`.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn mkdir(&self, path: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::Mkdir, path, &empty_payload()).await
    }

    /// List the directory at `path`.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn list(&self, path: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::List, path, &empty_payload()).await
    }

    /// Read the resource at `path`.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn get(&self, path: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::Get, path, &empty_payload()).await
    }

    /// Link the resource at `src` into `dest`, so that `dest` streams what
    /// `src` receives.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn link(&self, src: impl Into<Path>, dest: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::Link, dest, &src.into()).await
    }

    /// Remove a link created with [`link`](Self::link).
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn unlink(&self, src: impl Into<Path>, dest: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::Unlink, dest, &src.into()).await
    }

    /// Ask the server to stop streaming `path`.
    ///
    /// Streams obtained from [`stream`](Self::stream) send this on their own
    /// when the last subscriber detaches.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn stop(&self, path: impl Into<Path>) -> Result<Reply> {
        self.call(Verb::Stop, path, &empty_payload()).await
    }

    /// Stream the resource at `path`. Same as [`subscribe`](Self::subscribe).
    ///
    /// # Errors
    ///
    /// As for [`subscribe`](Self::subscribe).
    pub async fn stream<P>(&self, path: impl Into<Path>, payload: &P) -> Result<ReplyStream>
    where
        P: Serialize + ?Sized,
    {
        self.subscribe(path, payload).await
    }

    /// Display `frame` on the user's model.
    ///
    /// `frame` holds one RGB triple per window in row-major order, see
    /// [`display`](crate::protocol::display). It is sent as a binary blob.
    ///
    /// # Errors
    ///
    /// As for [`call`](Self::call).
    pub async fn put_model(&self, frame: &[u8]) -> Result<Reply> {
        let path = Path::model(&self.auth().user);
        self.call(Verb::Put, path, &Value::Binary(frame.to_vec())).await
    }

    /// Stream the user's model: display updates and input events.
    ///
    /// # Errors
    ///
    /// As for [`subscribe`](Self::subscribe).
    pub async fn stream_model(&self) -> Result<ReplyStream> {
        let path = Path::model(&self.auth().user);
        self.subscribe(path, &empty_payload()).await
    }
}
