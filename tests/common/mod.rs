//! Shared helpers for `nighthouse` integration tests.

use std::time::Duration;

use futures::StreamExt;
use nighthouse::{Reply, ReplyStream};

/// Result type for fallible tests.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Read `n` successful replies from `stream` and return their text payloads.
///
/// # Panics
///
/// Panics if the stream ends, yields an error or stalls for a second.
pub async fn take_texts(stream: &mut ReplyStream, n: usize) -> Vec<String> {
    let mut texts = Vec::with_capacity(n);
    for _ in 0..n {
        let reply: Reply = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .expect("stream stalled")
            .expect("stream ended early")
            .expect("stream yielded an error");
        texts.push(reply.payload_as().expect("text payload"));
    }
    texts
}

/// The four payloads the reference script pushes for a `STREAM`.
#[must_use]
pub fn expected_messages() -> Vec<String> { (0..4).map(|n| format!("Message {n}")).collect() }
