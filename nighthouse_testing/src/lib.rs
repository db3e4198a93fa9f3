//! Utilities for driving a [`Lighthouse`](nighthouse::Lighthouse) against a
//! scripted server during tests.
//!
//! [`Responder`] plays the server end of a
//! [`MemoryTransport`](nighthouse::transport::MemoryTransport): it decodes
//! every request, records it and answers with whatever the script returns.
//!
//! ```rust
//! use nighthouse::{Reply, Verb};
//! use nighthouse_testing::connect;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (lh, _server) = connect(|request| match request.verb {
//!     Verb::Get => vec![Reply::new(200, "Hello world!")],
//!     _ => vec![Reply::new(400, rmpv::Value::Nil)],
//! });
//! let reply = lh.get(["hello"]).await.expect("reply");
//! assert_eq!(reply.payload_as::<String>().expect("text"), "Hello world!");
//! # }
//! ```

pub mod logging;
pub mod metrics;

use std::time::Duration;

pub use logging::{LoggerHandle, logger};
use nighthouse::{
    Auth,
    Lighthouse,
    Reply,
    Request,
    TransportError,
    Verb,
    codec::{Codec, MessagePackCodec},
    transport::{MemoryPeer, MemoryTransport},
};
use rmpv::Value;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

/// A request as the scripted server sees it.
pub type RecordedRequest = Request<Value>;

/// Instructions injected into a running [`Responder`].
enum Control {
    Push(Reply),
    Fail(TransportError),
}

/// Scripted server end of an in-memory link.
///
/// Replies returned by the script without a request id are stamped with the
/// id of the request they answer.
pub struct Responder {
    control: mpsc::UnboundedSender<Control>,
    requests: watch::Receiver<Vec<RecordedRequest>>,
    task: JoinHandle<()>,
}

impl Responder {
    /// Start answering requests arriving on `peer`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(peer: MemoryPeer, script: F) -> Self
    where
        F: FnMut(&RecordedRequest) -> Vec<Reply> + Send + 'static,
    {
        let (control, control_rx) = mpsc::unbounded_channel();
        let (requests_tx, requests) = watch::channel(Vec::new());
        let task = tokio::spawn(serve(peer, script, control_rx, requests_tx));
        Self {
            control,
            requests,
            task,
        }
    }

    /// Push an unsolicited reply to the client.
    pub fn push(&self, reply: Reply) { let _ = self.control.send(Control::Push(reply)); }

    /// Break the link with `error`.
    pub fn fail(&self, error: TransportError) { let _ = self.control.send(Control::Fail(error)); }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> { self.requests.borrow().clone() }

    /// Number of requests received so far with `verb`.
    #[must_use]
    pub fn count(&self, verb: Verb) -> usize {
        self.requests.borrow().iter().filter(|r| r.verb == verb).count()
    }

    /// Wait until `count` requests with `verb` have arrived.
    ///
    /// # Panics
    ///
    /// Panics if they do not arrive within one second.
    pub async fn wait_for(&self, verb: Verb, count: usize) -> Vec<RecordedRequest> {
        let mut requests = self.requests.clone();
        let seen = tokio::time::timeout(
            Duration::from_secs(1),
            requests.wait_for(|all| all.iter().filter(|r| r.verb == verb).count() >= count),
        )
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {count} {verb} requests"))
        .expect("responder stopped");
        seen.iter().filter(|r| r.verb == verb).cloned().collect()
    }

    /// Returns `true` once the client closed its end.
    #[must_use]
    pub fn is_finished(&self) -> bool { self.task.is_finished() }
}

async fn serve<F>(
    mut peer: MemoryPeer,
    mut script: F,
    mut control: mpsc::UnboundedReceiver<Control>,
    requests: watch::Sender<Vec<RecordedRequest>>,
) where
    F: FnMut(&RecordedRequest) -> Vec<Reply>,
{
    loop {
        tokio::select! {
            message = peer.recv() => {
                let Some(bytes) = message else { break };
                let request: RecordedRequest = MessagePackCodec
                    .decode(&bytes)
                    .expect("client sent an undecodable request");
                let replies = script(&request);
                let id = request.id;
                requests.send_modify(|all| all.push(request));
                for mut reply in replies {
                    reply.id.get_or_insert(id);
                    send(&peer, &reply);
                }
            }
            Some(command) = control.recv() => match command {
                Control::Push(reply) => send(&peer, &reply),
                Control::Fail(error) => peer.fail(error),
            },
        }
    }
}

fn send(peer: &MemoryPeer, reply: &Reply) {
    peer.send(MessagePackCodec.encode(reply).expect("encode reply"));
}

/// Connect a [`Lighthouse`] for user `test` to a [`Responder`] running
/// `script`.
pub fn connect<F>(script: F) -> (Lighthouse<MemoryTransport>, Responder)
where
    F: FnMut(&RecordedRequest) -> Vec<Reply> + Send + 'static,
{
    let (transport, peer) = MemoryTransport::pair();
    let lh = Lighthouse::new(Auth::new("test", "test-token"), transport);
    (lh, Responder::spawn(peer, script))
}

/// The reference script: `GET ["hello"]` answers `"Hello world!"`, any
/// other `GET` answers 404, `STREAM` pushes `"Message 0"` to `"Message 3"`,
/// and everything else answers 200 with an empty payload.
pub fn hello_script(request: &RecordedRequest) -> Vec<Reply> {
    match request.verb {
        Verb::Get if request.path.segments() == ["hello"] => vec![Reply::new(200, "Hello world!")],
        Verb::Get => vec![Reply::new(404, Value::Nil).with_message("Not Found")],
        Verb::Stream => (0..4)
            .map(|n| Reply::new(200, format!("Message {n}")))
            .collect(),
        _ => vec![Reply::new(200, Value::Map(Vec::new()))],
    }
}
