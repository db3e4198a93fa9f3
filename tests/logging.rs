//! Log output of a connection, captured through the `log` facade.

use bytes::Bytes;
use log::Level;
use nighthouse::{
    Auth,
    Lighthouse,
    Reply,
    RequestId,
    codec::{Codec, MessagePackCodec},
    transport::MemoryTransport,
};
use nighthouse_testing::{LoggerHandle, logger};
use rmpv::Value;
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn malformed_messages_are_logged_at_warn(mut logger: LoggerHandle) {
    let (transport, peer) = MemoryTransport::pair();
    let lh = Lighthouse::new(Auth::new("test", "t"), transport);

    peer.send(Bytes::from_static(&[0xc1]));
    let not_a_reply = Value::Map(vec![(Value::from("RNUM"), Value::from(200))]);
    peer.send(MessagePackCodec.encode(&not_a_reply).expect("encode"));

    assert!(
        logger
            .find(Level::Warn, "discarding undecodable message")
            .is_some(),
        "undecodable bytes not logged"
    );
    assert!(
        logger
            .find(Level::Warn, "discarding message that is not a reply")
            .is_some(),
        "non-reply value not logged"
    );
    assert!(!lh.is_closed());
}

#[rstest]
#[tokio::test]
async fn replay_eviction_is_logged(mut logger: LoggerHandle) {
    let (transport, peer) = MemoryTransport::pair();
    let lh = nighthouse::LighthouseBuilder::new(Auth::new("test", "t"))
        .replay(nighthouse::ReplayConfig::default().with_max_per_id(1))
        .build(transport);

    for text in ["first", "second"] {
        let reply = Reply::new(200, text).with_id(RequestId::new(42));
        peer.send(MessagePackCodec.encode(&reply).expect("encode"));
    }

    let message = logger
        .find(Level::Warn, "replay queue full")
        .expect("eviction logged");
    assert!(message.contains("request_id=42"), "missing id: {message}");
    let kept = lh.receive(RequestId::new(42)).await.expect("buffered reply");
    assert_eq!(kept.payload, Value::from("second"));
}

#[rstest]
#[tokio::test]
async fn server_warnings_are_logged(mut logger: LoggerHandle) {
    let (transport, peer) = MemoryTransport::pair();
    let lh = Lighthouse::new(Auth::new("test", "t"), transport);
    let id = lh
        .send_request(nighthouse::Verb::Get, ["hello"], &())
        .await
        .expect("send");

    let mut reply = Reply::new(200, "Hello world!").with_id(id);
    reply.warnings.push("token expires soon".to_owned());
    peer.send(MessagePackCodec.encode(&reply).expect("encode"));

    let message = logger
        .find(Level::Warn, "server sent warnings")
        .expect("warnings logged");
    assert!(message.contains("token expires soon"));
    lh.receive(id).await.expect("reply");
}
