// Wire-level behavior: id echo, args/params aliasing, persistent
// server-side connections, error rendering, and frame limits.

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use scriptlink::host::{HostError, RpcTransport};
use scriptlink::protocol::{FrameCodec, Response};
use serde_json::{Value, json};
use sl_test_utils::{ScriptedEngine, TestServer};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

type Wire = Framed<TcpStream, FrameCodec>;

async fn connect(server: &TestServer) -> Wire {
    let stream = TcpStream::connect(server.addr()).await.unwrap();
    Framed::new(stream, FrameCodec::new())
}

async fn send_json(wire: &mut Wire, payload: &Value) {
    let bytes = serde_json::to_vec(payload).unwrap();
    wire.send(Bytes::from(bytes)).await.unwrap();
}

async fn recv_response(wire: &mut Wire) -> Response {
    let frame = wire.next().await.unwrap().unwrap();
    serde_json::from_slice(&frame).unwrap()
}

/// The request id is echoed verbatim, and one connection serves many
/// sequential requests.
#[tokio::test]
async fn id_echo_on_a_persistent_connection() {
    let server = TestServer::start(Arc::new(ScriptedEngine::new())).await.unwrap();
    let mut wire = connect(&server).await;

    for id in [7u64, 901, 35_001] {
        send_json(&mut wire, &json!({"id": id, "method": "ping", "args": null})).await;
        let response = recv_response(&mut wire).await;
        assert_eq!(response.id, Some(id));
        assert!(response.ok);
        assert_eq!(response.result, Some(json!("pong")));
    }

    server.stop().await;
}

/// `params` is accepted as the argument carrier.
#[tokio::test]
async fn params_alias_is_accepted() {
    let server = TestServer::start(Arc::new(ScriptedEngine::new())).await.unwrap();
    server.bus().emit("tick", json!(1));
    let mut wire = connect(&server).await;

    send_json(
        &mut wire,
        &json!({"id": 4, "method": "pollEvents", "params": {"cursor": 0}}),
    )
    .await;
    let response = recv_response(&mut wire).await;
    assert!(response.ok);
    assert_eq!(response.result.unwrap()["cursor"], json!(1));

    server.stop().await;
}

/// Unknown methods are rendered, not dropped.
#[tokio::test]
async fn unknown_method_is_rendered() {
    let server = TestServer::start(Arc::new(ScriptedEngine::new())).await.unwrap();
    let mut wire = connect(&server).await;

    send_json(&mut wire, &json!({"id": 2, "method": "selfDestruct", "args": {}})).await;
    let response = recv_response(&mut wire).await;
    assert!(!response.ok);
    assert_eq!(response.error.as_deref(), Some("Unknown method: selfDestruct"));

    server.stop().await;
}

/// A payload that is not a request envelope gets an id-less error and
/// the connection keeps serving.
#[tokio::test]
async fn undecodable_payload_keeps_the_connection() {
    let server = TestServer::start(Arc::new(ScriptedEngine::new())).await.unwrap();
    let mut wire = connect(&server).await;

    wire.send(Bytes::from_static(b"{this is not json")).await.unwrap();
    let response = recv_response(&mut wire).await;
    assert!(!response.ok);
    assert!(response.id.is_none());

    // Same socket still answers.
    send_json(&mut wire, &json!({"id": 5, "method": "ping", "args": null})).await;
    assert!(recv_response(&mut wire).await.ok);

    server.stop().await;
}

/// A frame header past the 32 MiB cap fails the stream: the server
/// drops the connection without replying.
#[tokio::test]
async fn oversized_frame_closes_the_connection() {
    let server = TestServer::start(Arc::new(ScriptedEngine::new())).await.unwrap();
    let mut stream = TcpStream::connect(server.addr()).await.unwrap();

    let oversized = (32 * 1024 * 1024u32) + 1;
    stream.write_all(&oversized.to_be_bytes()).await.unwrap();
    stream.flush().await.unwrap();

    let mut buf = [0u8; 16];
    let n = stream.read(&mut buf).await.unwrap();
    assert_eq!(n, 0, "server closed without a response frame");

    server.stop().await;
}

/// Connection refused surfaces as a transport error.
#[tokio::test]
async fn refused_connection_is_a_transport_error() {
    let transport = RpcTransport::new("127.0.0.1:9");
    let err = transport.call("ping", Value::Null).await.unwrap_err();
    assert!(matches!(err, HostError::Transport(_)));
}

/// A peer that closes before responding is a transport error, not a
/// protocol error.
#[tokio::test]
async fn close_before_response_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and immediately drop the socket.
        let _ = listener.accept().await;
    });

    let transport = RpcTransport::new(addr.to_string());
    let err = transport.call("ping", Value::Null).await.unwrap_err();
    assert!(matches!(err, HostError::Transport(_)));
}

/// A response frame that is valid JSON but not an object is a protocol
/// error.
#[tokio::test]
async fn non_object_response_is_a_protocol_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut wire = Framed::new(stream, FrameCodec::new());
        // Swallow the request, answer with a bare array.
        let _ = wire.next().await;
        let _ = wire.send(Bytes::from_static(b"[1,2,3]")).await;
    });

    let transport = RpcTransport::new(addr.to_string());
    let err = transport.call("ping", Value::Null).await.unwrap_err();
    assert!(matches!(err, HostError::Protocol(_)));
}
