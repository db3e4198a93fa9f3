#![cfg(feature = "metrics")]
//! Tests for `nighthouse` metrics.
//!
//! These tests drive a connection on a current-thread runtime inside
//! `metrics::with_local_recorder` so every update lands in a
//! `metrics_util::debugging::DebuggingRecorder`.

use std::future::Future;

use bytes::Bytes;
use nighthouse::{
    Verb,
    metrics::{MALFORMED_MESSAGES, REPLIES_TOTAL, REQUESTS_TOTAL, SUBSCRIPTIONS_ACTIVE},
};
use nighthouse_testing::{
    connect,
    hello_script,
    metrics::{capture, counter_value, debugging_recorder_setup, gauge_value},
};

fn run_recorded<F, Fut>(test: F) -> Vec<nighthouse_testing::metrics::Series>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = ()>,
{
    let (snapshotter, recorder) = debugging_recorder_setup();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    metrics::with_local_recorder(&recorder, || runtime.block_on(test()));
    capture(&snapshotter)
}

#[test]
fn requests_and_replies_are_counted() {
    let series = run_recorded(|| async {
        let (lh, _server) = connect(hello_script);
        lh.get(["hello"]).await.expect("hello");
        lh.get(["missing"]).await.expect_err("missing");
        lh.put(["x"], &1).await.expect("put");
    });
    assert_eq!(counter_value(&series, REQUESTS_TOTAL, Some(("verb", "GET"))), 2);
    assert_eq!(counter_value(&series, REQUESTS_TOTAL, Some(("verb", "PUT"))), 1);
    assert_eq!(counter_value(&series, REPLIES_TOTAL, Some(("outcome", "success"))), 2);
    assert_eq!(counter_value(&series, REPLIES_TOTAL, Some(("outcome", "error"))), 1);
}

#[test]
fn subscriptions_gauge_tracks_shared_streams() {
    let series = run_recorded(|| async {
        let (lh, server) = connect(hello_script);
        let first = lh.stream_model().await.expect("first");
        let second = lh.stream_model().await.expect("second");
        let other = lh.stream(["other"], &()).await.expect("other");
        first.detach().await.expect("detach");
        second.detach().await.expect("detach");
        server.wait_for(Verb::Stop, 1).await;
        drop(other);
    });
    // Dropping `other` releases it immediately, even though its STOP is
    // still queued when the runtime shuts down.
    assert_eq!(gauge_value(&series, SUBSCRIPTIONS_ACTIVE), Some(0.0));
}

#[test]
fn malformed_messages_are_counted() {
    let series = run_recorded(|| async {
        let (transport, peer) = nighthouse::transport::MemoryTransport::pair();
        let _lh = nighthouse::Lighthouse::new(nighthouse::Auth::new("t", "t"), transport);
        peer.send(Bytes::from_static(&[0xc1]));
        peer.send(Bytes::from_static(&[0xa3, b'a', b'b', b'c']));
    });
    assert_eq!(counter_value(&series, MALFORMED_MESSAGES, None), 2);
}
