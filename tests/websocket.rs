//! Connection over a real WebSocket to a minimal in-process server.

use futures::{SinkExt, StreamExt};
use nighthouse::{
    Auth,
    LighthouseBuilder,
    Reply,
    Request,
    Verb,
    codec::{Codec, MessagePackCodec},
};
use rmpv::Value;
use tokio::net::TcpListener;
use tokio_tungstenite::{accept_async, tungstenite::Message};

mod common;
use common::{TestResult, expected_messages, take_texts};

/// Serve one client with the reference script until it disconnects.
async fn lighthouse_server() -> TestResult<(String, tokio::task::JoinHandle<Vec<Verb>>)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept client");
        let mut socket = accept_async(stream).await.expect("handshake");
        let mut verbs = Vec::new();
        while let Some(Ok(message)) = socket.next().await {
            let Message::Binary(data) = message else {
                continue;
            };
            let request: Request<Value> = MessagePackCodec.decode(&data).expect("decode request");
            verbs.push(request.verb);
            let replies = match request.verb {
                Verb::Get => vec![Reply::new(200, "Hello world!")],
                Verb::Stream => (0..4).map(|n| Reply::new(200, format!("Message {n}"))).collect(),
                _ => vec![Reply::new(200, Value::Nil)],
            };
            for reply in replies {
                let bytes = MessagePackCodec
                    .encode(&reply.with_id(request.id))
                    .expect("encode reply");
                if socket.send(Message::Binary(bytes.into())).await.is_err() {
                    break;
                }
            }
        }
        verbs
    });
    Ok((format!("ws://{addr}/websocket"), handle))
}

#[tokio::test]
async fn requests_and_streams_over_websocket() -> TestResult {
    let (url, server) = lighthouse_server().await?;
    let lh = LighthouseBuilder::new(Auth::new("test", "t"))
        .url(url)
        .connect()
        .await?;

    let reply = lh.get(["hello"]).await?;
    assert_eq!(reply.payload_as::<String>()?, "Hello world!");

    let mut stream = lh.stream_model().await?;
    assert_eq!(take_texts(&mut stream, 4).await, expected_messages());
    stream.detach().await?;

    lh.close().await?;
    let verbs = server.await?;
    assert_eq!(verbs, [Verb::Get, Verb::Stream, Verb::Stop]);
    Ok(())
}

#[tokio::test]
async fn server_disconnect_closes_connection() -> TestResult {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept client");
        let mut socket = accept_async(stream).await.expect("handshake");
        // Wait for one request, then hang up without answering.
        let _ = socket.next().await;
        let _ = socket.close(None).await;
    });

    let lh = LighthouseBuilder::new(Auth::new("test", "t"))
        .url(format!("ws://{addr}"))
        .connect()
        .await?;
    let err = lh.get(["hello"]).await.expect_err("server hung up");
    assert!(matches!(err, nighthouse::LighthouseError::Transport(_)));
    assert!(lh.is_closed());
    server.await?;
    Ok(())
}
