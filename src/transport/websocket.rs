//! WebSocket transport built on `tokio-tungstenite`.
//!
//! [`WebSocketTransport::connect`] starts the handshake in the background and
//! returns immediately; [`Transport::ready`] waits for the outcome. Every
//! message travels as one binary frame.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{
    SinkExt,
    StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    net::TcpStream,
    sync::{Mutex, watch},
};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{HandlerSlot, ReceiveHandler, Transport};
use crate::error::TransportError;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Observable state of the link.
#[derive(Clone, Debug)]
enum LinkStatus {
    Connecting,
    Open,
    Failed(TransportError),
    Closed,
}

struct Inner {
    writer: Mutex<Option<SplitSink<Socket, Message>>>,
    status: watch::Sender<LinkStatus>,
    slot: HandlerSlot,
    cancel: CancellationToken,
}

/// Transport speaking binary WebSocket frames.
///
/// `wss://` URLs require the `tls` feature.
pub struct WebSocketTransport {
    inner: Arc<Inner>,
}

impl WebSocketTransport {
    /// Start connecting to `url`.
    ///
    /// Must be called from within a tokio runtime; the handshake and the
    /// reader run on spawned tasks.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nighthouse::transport::{Transport, WebSocketTransport};
    ///
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), nighthouse::TransportError> {
    /// let transport = WebSocketTransport::connect("ws://127.0.0.1:9000/websocket");
    /// transport.ready().await?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn connect(url: impl Into<String>) -> Self {
        let url = url.into();
        let (status, _) = watch::channel(LinkStatus::Connecting);
        let inner = Arc::new(Inner {
            writer: Mutex::new(None),
            status,
            slot: HandlerSlot::default(),
            cancel: CancellationToken::new(),
        });
        tokio::spawn(establish(inner.clone(), url));
        Self { inner }
    }

    fn status_error(&self) -> TransportError {
        match &*self.inner.status.borrow() {
            LinkStatus::Failed(err) => err.clone(),
            _ => TransportError::Closed,
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) { self.inner.cancel.cancel(); }
}

async fn establish(inner: Arc<Inner>, url: String) {
    let connected = tokio::select! {
        () = inner.cancel.cancelled() => return,
        result = connect_async(url.as_str()) => result,
    };
    match connected {
        Ok((socket, _response)) => {
            if inner.cancel.is_cancelled() {
                return;
            }
            info!(%url, "websocket connected");
            let (sink, stream) = socket.split();
            *inner.writer.lock().await = Some(sink);
            inner.status.send_replace(LinkStatus::Open);
            read_loop(inner, stream).await;
        }
        Err(e) => {
            warn!(%url, error = %e, "websocket connect failed");
            inner
                .status
                .send_replace(LinkStatus::Failed(TransportError::connect(e)));
        }
    }
}

async fn read_loop(inner: Arc<Inner>, mut stream: SplitStream<Socket>) {
    let failure = loop {
        let frame = tokio::select! {
            () = inner.cancel.cancelled() => return,
            frame = stream.next() => frame,
        };
        match frame {
            Some(Ok(Message::Binary(data))) => inner.slot.deliver(Ok(data)),
            Some(Ok(Message::Text(text))) => {
                warn!(bytes = text.len(), "ignoring text frame");
            }
            Some(Ok(Message::Close(frame))) => {
                debug!(?frame, "websocket closed by peer");
                break TransportError::Disconnected;
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
            Some(Err(e)) => break TransportError::link(e),
            None => break TransportError::Disconnected,
        }
    };
    inner.writer.lock().await.take();
    inner
        .status
        .send_replace(LinkStatus::Failed(failure.clone()));
    inner.slot.deliver(Err(failure));
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, message: Bytes) -> Result<(), TransportError> {
        self.ready().await?;
        let mut writer = self.inner.writer.lock().await;
        let Some(sink) = writer.as_mut() else {
            return Err(self.status_error());
        };
        sink.send(Message::Binary(message))
            .await
            .map_err(TransportError::send)
    }

    async fn ready(&self) -> Result<(), TransportError> {
        let mut status = self.inner.status.subscribe();
        let settled = status
            .wait_for(|s| !matches!(s, LinkStatus::Connecting))
            .await
            .map_err(|_| TransportError::Closed)?;
        match &*settled {
            LinkStatus::Open => Ok(()),
            LinkStatus::Failed(err) => Err(err.clone()),
            LinkStatus::Connecting | LinkStatus::Closed => Err(TransportError::Closed),
        }
    }

    fn on_receive(&self, handler: ReceiveHandler) { self.inner.slot.set(handler); }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.cancel.cancel();
        let sink = self.inner.writer.lock().await.take();
        self.inner.status.send_if_modified(|status| {
            if matches!(status, LinkStatus::Closed) {
                false
            } else {
                *status = LinkStatus::Closed;
                true
            }
        });
        match sink {
            Some(mut sink) => {
                info!("closing websocket");
                sink.close().await.map_err(TransportError::send)
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    use super::*;
    use crate::transport::Inbound;

    async fn echo_server() -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("listener addr");
        let handle = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept client");
            let mut socket = accept_async(stream).await.expect("websocket handshake");
            while let Some(Ok(message)) = socket.next().await {
                if message.is_binary() && socket.send(message).await.is_err() {
                    break;
                }
            }
        });
        (format!("ws://{addr}"), handle)
    }

    #[tokio::test]
    async fn binary_frames_round_trip() {
        let (url, server) = echo_server().await;
        let transport = WebSocketTransport::connect(url);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        transport.on_receive(Arc::new(move |inbound: Inbound| {
            let _ = tx.send(inbound);
        }));
        transport.ready().await.expect("link ready");

        transport
            .send(Bytes::from_static(b"hello"))
            .await
            .expect("send frame");
        let echoed = rx.recv().await.expect("inbound event").expect("message");
        assert_eq!(echoed, Bytes::from_static(b"hello"));

        transport.close().await.expect("close");
        transport.close().await.expect("second close is a no-op");
        assert!(transport.send(Bytes::from_static(b"late")).await.is_err());
        server.await.expect("join server");
    }

    #[tokio::test]
    async fn unreachable_server_fails_ready() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("listener addr");
        drop(listener);

        let transport = WebSocketTransport::connect(format!("ws://{addr}"));
        assert!(matches!(
            transport.ready().await,
            Err(TransportError::Connect(_))
        ));
    }
}
