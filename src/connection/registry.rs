//! Routing tables of one connection.
//!
//! The [`Registry`] owns everything an inbound reply can be routed to:
//! pending calls, raw per-id streams, shared subscriptions and the replay
//! buffer. It lives behind a single mutex in the connection and every method
//! runs to completion without awaiting, so a reply is routed atomically with
//! respect to registration and shutdown.

use std::collections::{BTreeMap, HashMap, VecDeque};

use tokio::sync::mpsc;
use tracing::debug;

use super::replay::ReplayBuffer;
use crate::{
    config::ReplayConfig,
    deferred::{Deferred, Settlement, deferred},
    error::{LighthouseError, Result, TransportError},
    metrics::{self, ReplyOutcome},
    protocol::{Path, Reply, RequestId},
};

/// Queue feeding one [`ReplyStream`](super::ReplyStream).
pub(crate) type Sink = mpsc::UnboundedSender<Result<Reply>>;

/// Where replies for one request id go.
enum Route {
    /// A single-shot call waiting for its reply.
    Call(Deferred<Reply, LighthouseError>),
    /// A stream consumer registered directly for the id.
    Raw(Sink),
    /// The origin id of the subscription for a path.
    Subscription(Path),
    /// A subscription that was detached locally; late pushes are dropped.
    Detached,
}

/// One server-side stream shared by local subscribers.
///
/// `history` holds the most recent replies fanned out so far; a subscriber
/// that joins later receives them before anything new.
struct Subscription {
    origin: RequestId,
    subscribers: BTreeMap<RequestId, Sink>,
    history: VecDeque<Reply>,
}

/// Result of attaching a subscriber to a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Attach {
    /// The subscriber opened a new subscription and must send `STREAM`.
    Opened,
    /// The subscriber joined an existing subscription.
    Joined,
}

pub(crate) struct Registry {
    closed: bool,
    /// Set when the registry was closed by a link failure.
    failure: Option<TransportError>,
    routes: HashMap<RequestId, Route>,
    subscriptions: HashMap<Path, Subscription>,
    replay: ReplayBuffer,
    history_limit: usize,
}

/// Turn a reply into the result a consumer observes.
fn settle_with(id: RequestId, reply: Reply) -> Result<Reply> {
    if reply.is_success() {
        Ok(reply)
    } else {
        Err(LighthouseError::response(id, reply))
    }
}

impl Registry {
    pub(crate) fn new(replay: ReplayConfig) -> Self {
        Self {
            closed: false,
            failure: None,
            routes: HashMap::new(),
            subscriptions: HashMap::new(),
            replay: ReplayBuffer::new(replay),
            history_limit: replay.max_per_id,
        }
    }

    pub(crate) fn is_closed(&self) -> bool { self.closed }

    /// The error a consumer of `id` was failed with at shutdown, or `None`
    /// while the registry is open.
    pub(crate) fn rejection(&self, id: RequestId) -> Option<LighthouseError> {
        if !self.closed {
            return None;
        }
        Some(match &self.failure {
            Some(error) => LighthouseError::Transport(error.clone()),
            None => LighthouseError::closed(id),
        })
    }

    fn claim(&self, id: RequestId) -> Result<()> {
        if self.closed {
            return Err(LighthouseError::closed(id));
        }
        if self.routes.contains_key(&id) {
            return Err(LighthouseError::Busy { request_id: id });
        }
        Ok(())
    }

    /// Register a single-shot consumer for `id`.
    ///
    /// A reply already waiting in the replay buffer settles the returned
    /// future immediately.
    pub(crate) fn expect_reply(
        &mut self,
        id: RequestId,
    ) -> Result<Settlement<Reply, LighthouseError>> {
        self.claim(id)?;
        let (mut cell, settlement) = deferred();
        match self.replay.pop(id) {
            Some(reply) => {
                debug!(request_id = %id, "replaying buffered reply");
                cell.settle(settle_with(id, reply));
            }
            None => {
                self.routes.insert(id, Route::Call(cell));
            }
        }
        Ok(settlement)
    }

    /// Register a stream consumer for `id`, replaying buffered replies first.
    pub(crate) fn expect_stream(&mut self, id: RequestId, sink: Sink) -> Result<()> {
        self.claim(id)?;
        for reply in self.replay.drain(id) {
            let ended = !reply.is_success();
            if sink.send(settle_with(id, reply)).is_err() || ended {
                return Ok(());
            }
        }
        self.routes.insert(id, Route::Raw(sink));
        Ok(())
    }

    /// Remove the raw stream consumer of `id`, if there is one.
    pub(crate) fn release_stream(&mut self, id: RequestId) {
        if matches!(self.routes.get(&id), Some(Route::Raw(_))) {
            self.routes.remove(&id);
        }
    }

    /// Forget the consumer of `id` after its request could not be sent.
    pub(crate) fn abandon(&mut self, id: RequestId) { self.routes.remove(&id); }

    /// Drop the tombstone a detached subscription left behind.
    pub(crate) fn forget_detached(&mut self, origin: RequestId) {
        if matches!(self.routes.get(&origin), Some(Route::Detached)) {
            self.routes.remove(&origin);
        }
    }

    /// Add subscriber `id` to the subscription for `path`.
    ///
    /// A subscriber joining a running subscription first receives the
    /// replies kept in its history, so it sees the same sequence as the
    /// subscribers that attached earlier.
    pub(crate) fn attach(&mut self, path: &Path, id: RequestId, sink: Sink) -> Result<Attach> {
        self.claim(id)?;
        if let Some(subscription) = self.subscriptions.get_mut(path) {
            for reply in &subscription.history {
                let _ = sink.send(Ok(reply.clone()));
            }
            debug!(
                %path,
                subscriber = %id,
                origin = %subscription.origin,
                replayed = subscription.history.len(),
                "joined subscription"
            );
            subscription.subscribers.insert(id, sink);
            return Ok(Attach::Joined);
        }
        self.subscriptions.insert(
            path.clone(),
            Subscription {
                origin: id,
                subscribers: BTreeMap::from([(id, sink)]),
                history: VecDeque::new(),
            },
        );
        self.routes.insert(id, Route::Subscription(path.clone()));
        metrics::inc_subscriptions();
        debug!(%path, origin = %id, "opened subscription");
        Ok(Attach::Opened)
    }

    /// Remove subscriber `id` from the subscription for `path`.
    ///
    /// Returns the origin id when the subscription lost its last subscriber
    /// and the server must be told to stop.
    pub(crate) fn detach(&mut self, path: &Path, id: RequestId) -> Option<RequestId> {
        let subscription = self.subscriptions.get_mut(path)?;
        subscription.subscribers.remove(&id)?;
        if !subscription.subscribers.is_empty() {
            debug!(%path, subscriber = %id, "detached subscriber");
            return None;
        }
        let origin = subscription.origin;
        self.subscriptions.remove(path);
        self.routes.insert(origin, Route::Detached);
        metrics::dec_subscriptions(1);
        debug!(%path, %origin, "last subscriber detached");
        Some(origin)
    }

    /// Tear down the subscription opened by `origin` after its `STREAM`
    /// request failed, handing `error` to everyone attached.
    pub(crate) fn abort_subscription(&mut self, path: &Path, origin: RequestId, error: &LighthouseError) {
        self.routes.remove(&origin);
        let owned = self
            .subscriptions
            .get(path)
            .is_some_and(|subscription| subscription.origin == origin);
        if !owned {
            return;
        }
        if let Some(subscription) = self.subscriptions.remove(path) {
            metrics::dec_subscriptions(1);
            for sink in subscription.subscribers.into_values() {
                let _ = sink.send(Err(error.clone()));
            }
        }
    }

    /// Route one inbound reply.
    pub(crate) fn route(&mut self, reply: Reply) -> ReplyOutcome {
        if self.closed {
            debug!(status = reply.status, "connection closed; dropping reply");
            return ReplyOutcome::Dropped;
        }
        let Some(id) = reply.id else {
            debug!(status = reply.status, "dropping reply without request id");
            return ReplyOutcome::Dropped;
        };
        let outcome = if reply.is_success() {
            ReplyOutcome::Success
        } else {
            ReplyOutcome::Error
        };
        match self.routes.remove(&id) {
            Some(Route::Call(mut cell)) => {
                cell.settle(settle_with(id, reply));
            }
            Some(Route::Raw(sink)) => {
                let ended = outcome == ReplyOutcome::Error;
                if sink.send(settle_with(id, reply)).is_ok() && !ended {
                    self.routes.insert(id, Route::Raw(sink));
                }
            }
            Some(Route::Subscription(path)) => self.fan_out(id, path, reply),
            Some(Route::Detached) => {
                debug!(request_id = %id, "dropping push for detached subscription");
                self.routes.insert(id, Route::Detached);
                return ReplyOutcome::Dropped;
            }
            None => {
                debug!(request_id = %id, "no consumer yet; buffering reply");
                self.replay.push(id, reply);
                return ReplyOutcome::Buffered;
            }
        }
        outcome
    }

    fn fan_out(&mut self, origin: RequestId, path: Path, reply: Reply) {
        if reply.is_success() {
            if let Some(subscription) = self.subscriptions.get_mut(&path) {
                for sink in subscription.subscribers.values() {
                    let _ = sink.send(Ok(reply.clone()));
                }
                if self.history_limit > 0 {
                    if subscription.history.len() == self.history_limit {
                        subscription.history.pop_front();
                    }
                    subscription.history.push_back(reply);
                }
            }
            self.routes.insert(origin, Route::Subscription(path));
            return;
        }
        debug!(%path, %origin, status = reply.status, "server ended subscription");
        let error = LighthouseError::response(origin, reply);
        if let Some(subscription) = self.subscriptions.remove(&path) {
            metrics::dec_subscriptions(1);
            for sink in subscription.subscribers.into_values() {
                let _ = sink.send(Err(error.clone()));
            }
        }
    }

    /// Mark the registry closed and fail every consumer.
    ///
    /// Consumers observe [`LighthouseError::Transport`] when `failure` is
    /// given and [`LighthouseError::Closed`] carrying their id otherwise.
    /// Returns `false` if the registry was already closed.
    pub(crate) fn shutdown(&mut self, failure: Option<TransportError>) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        let cause = |id| match &failure {
            Some(error) => LighthouseError::Transport(error.clone()),
            None => LighthouseError::closed(id),
        };
        for (id, route) in self.routes.drain() {
            match route {
                Route::Call(mut cell) => {
                    cell.reject(cause(id));
                }
                Route::Raw(sink) => {
                    let _ = sink.send(Err(cause(id)));
                }
                Route::Subscription(_) | Route::Detached => {}
            }
        }
        let live = self.subscriptions.len();
        for (_, subscription) in self.subscriptions.drain() {
            for (id, sink) in subscription.subscribers {
                let _ = sink.send(Err(cause(id)));
            }
        }
        if live > 0 {
            metrics::dec_subscriptions(live);
        }
        self.replay.clear();
        self.failure = failure;
        true
    }

    #[cfg(test)]
    fn buffered(&self) -> usize { self.replay.len() }
}

#[cfg(test)]
mod tests {
    use rmpv::Value;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn registry() -> Registry { Registry::new(ReplayConfig::default()) }

    fn reply(id: u64, status: u16, text: &str) -> Reply {
        Reply::new(status, Value::from(text)).with_id(RequestId::new(id))
    }

    fn payload(item: Option<Result<Reply>>) -> String {
        let reply = item.expect("queued item").expect("successful reply");
        reply.payload_as().expect("string payload")
    }

    #[rstest]
    #[tokio::test]
    async fn call_settles_once(mut registry: Registry) {
        let settlement = registry.expect_reply(RequestId::new(1)).expect("register");
        assert_eq!(registry.route(reply(1, 200, "first")), ReplyOutcome::Success);
        assert_eq!(registry.route(reply(1, 200, "second")), ReplyOutcome::Buffered);
        let reply = settlement.await.expect("resolved");
        assert_eq!(reply.payload, Value::from("first"));
    }

    #[rstest]
    #[tokio::test]
    async fn error_status_rejects_call(mut registry: Registry) {
        let settlement = registry.expect_reply(RequestId::new(4)).expect("register");
        registry.route(reply(4, 404, "missing"));
        let err = settlement.await.expect_err("rejected");
        assert!(matches!(err, LighthouseError::Response { request_id, .. } if request_id == RequestId::new(4)));
    }

    #[rstest]
    #[tokio::test]
    async fn early_reply_is_replayed(mut registry: Registry) {
        assert_eq!(registry.route(reply(2, 200, "early")), ReplyOutcome::Buffered);
        let settlement = registry.expect_reply(RequestId::new(2)).expect("register");
        assert_eq!(settlement.await.expect("replayed").payload, Value::from("early"));
        assert_eq!(registry.buffered(), 0);
    }

    #[rstest]
    fn raw_stream_replays_in_order(mut registry: Registry) {
        registry.route(reply(3, 200, "a"));
        registry.route(reply(3, 200, "b"));
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.expect_stream(RequestId::new(3), tx).expect("register");
        registry.route(reply(3, 200, "c"));
        assert_eq!(payload(rx.try_recv().ok()), "a");
        assert_eq!(payload(rx.try_recv().ok()), "b");
        assert_eq!(payload(rx.try_recv().ok()), "c");
    }

    #[rstest]
    fn second_consumer_for_an_id_is_refused(mut registry: Registry) {
        let _pending = registry.expect_reply(RequestId::new(5)).expect("register");
        let (tx, _rx) = mpsc::unbounded_channel();
        assert!(matches!(
            registry.expect_stream(RequestId::new(5), tx),
            Err(LighthouseError::Busy { .. })
        ));
    }

    #[rstest]
    fn subscribers_share_one_origin(mut registry: Registry) {
        let path = Path::from(["user", "alice", "model"]);
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        assert_eq!(registry.attach(&path, RequestId::new(1), tx1).expect("attach"), Attach::Opened);
        assert_eq!(registry.attach(&path, RequestId::new(2), tx2).expect("attach"), Attach::Joined);

        registry.route(reply(1, 200, "frame"));
        assert_eq!(payload(rx1.try_recv().ok()), "frame");
        assert_eq!(payload(rx2.try_recv().ok()), "frame");

        assert_eq!(registry.detach(&path, RequestId::new(1)), None);
        assert_eq!(registry.detach(&path, RequestId::new(2)), Some(RequestId::new(1)));
        assert_eq!(registry.detach(&path, RequestId::new(2)), None);
        assert_eq!(registry.route(reply(1, 200, "late")), ReplyOutcome::Dropped);
        registry.forget_detached(RequestId::new(1));
        assert_eq!(registry.route(reply(1, 200, "later")), ReplyOutcome::Buffered);
    }

    #[rstest]
    fn late_subscriber_receives_history(mut registry: Registry) {
        let path = Path::from(["feed"]);
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        registry.attach(&path, RequestId::new(1), tx1).expect("attach");
        registry.route(reply(1, 200, "a"));
        registry.route(reply(1, 200, "b"));

        let (tx2, mut rx2) = mpsc::unbounded_channel();
        assert_eq!(registry.attach(&path, RequestId::new(2), tx2).expect("attach"), Attach::Joined);
        registry.route(reply(1, 200, "c"));

        for rx in [&mut rx1, &mut rx2] {
            for expected in ["a", "b", "c"] {
                assert_eq!(payload(rx.try_recv().ok()), expected);
            }
            assert!(rx.try_recv().is_err());
        }
    }

    #[rstest]
    fn history_keeps_the_most_recent_replies() {
        let mut registry = Registry::new(ReplayConfig::default().with_max_per_id(2));
        let path = Path::from(["feed"]);
        let (tx1, _rx1) = mpsc::unbounded_channel();
        registry.attach(&path, RequestId::new(1), tx1).expect("attach");
        for text in ["a", "b", "c"] {
            registry.route(reply(1, 200, text));
        }

        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.attach(&path, RequestId::new(2), tx2).expect("attach");
        assert_eq!(payload(rx2.try_recv().ok()), "b");
        assert_eq!(payload(rx2.try_recv().ok()), "c");
        assert!(rx2.try_recv().is_err());
    }

    #[rstest]
    fn error_status_ends_subscription(mut registry: Registry) {
        let path = Path::from(["stream"]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.attach(&path, RequestId::new(1), tx).expect("attach");
        registry.route(reply(1, 403, "forbidden"));
        assert!(matches!(rx.try_recv(), Ok(Err(LighthouseError::Response { .. }))));
        assert!(matches!(rx.try_recv(), Err(mpsc::error::TryRecvError::Disconnected)));
        assert_eq!(registry.detach(&path, RequestId::new(1)), None);
    }

    #[rstest]
    #[tokio::test]
    async fn shutdown_fails_everyone_once(mut registry: Registry) {
        let settlement = registry.expect_reply(RequestId::new(1)).expect("register");
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.attach(&Path::from(["s"]), RequestId::new(2), tx).expect("attach");
        registry.route(reply(9, 200, "orphan"));

        assert!(registry.shutdown(None));
        assert!(!registry.shutdown(Some(TransportError::Disconnected)));
        assert!(registry.is_closed());
        assert_eq!(registry.buffered(), 0);

        let err = settlement.await.expect_err("rejected");
        assert!(matches!(err, LighthouseError::Closed { request_id: Some(id) } if id == RequestId::new(1)));
        assert!(matches!(rx.try_recv(), Ok(Err(LighthouseError::Closed { .. }))));
        assert!(matches!(
            registry.expect_reply(RequestId::new(3)),
            Err(LighthouseError::Closed { .. })
        ));
        assert!(matches!(
            registry.rejection(RequestId::new(3)),
            Some(LighthouseError::Closed { request_id: Some(id) }) if id == RequestId::new(3)
        ));
    }

    #[rstest]
    fn link_failure_is_remembered(mut registry: Registry) {
        assert!(registry.rejection(RequestId::new(1)).is_none());
        assert!(registry.shutdown(Some(TransportError::Disconnected)));
        assert!(matches!(
            registry.rejection(RequestId::new(1)),
            Some(LighthouseError::Transport(TransportError::Disconnected))
        ));
    }
}
