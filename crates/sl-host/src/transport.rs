//! Reconnect-per-request RPC transport.
//!
//! Each call opens a fresh TCP connection, writes one request frame,
//! reads one response frame, and closes.  The engine can therefore stay
//! completely stateless about connections; session identity lives in
//! the payload, not the socket.
//!
//! No retries and no built-in timeout: callers decide both.

use crate::error::HostError;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use rand::Rng;
use serde_json::Value;
use sl_protocol::{FrameCodec, Request, Response};
use std::io;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct RpcTransport {
    endpoint: String,
}

impl RpcTransport {
    /// `endpoint` is a `host:port` target.
    pub fn new(endpoint: impl Into<String>) -> Self {
        RpcTransport {
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One full round trip.  The socket is dropped on every exit path.
    pub async fn call(&self, method: &str, args: Value) -> Result<Response, HostError> {
        let id = request_id();
        let stream = TcpStream::connect(&self.endpoint).await?;
        stream.set_nodelay(true)?;
        let mut framed = Framed::new(stream, FrameCodec::new());

        let request = Request {
            id,
            method: method.to_owned(),
            args,
        };
        let payload = serde_json::to_vec(&request)
            .map_err(|e| HostError::Protocol(format!("encode request: {e}")))?;
        trace!(id, method, len = payload.len(), "request");
        framed.send(Bytes::from(payload)).await?;

        let frame = match framed.next().await {
            Some(frame) => frame?,
            None => {
                return Err(HostError::Transport(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before response",
                )));
            }
        };
        let value: Value = serde_json::from_slice(&frame)
            .map_err(|e| HostError::Protocol(format!("response JSON: {e}")))?;
        if !value.is_object() {
            return Err(HostError::Protocol("response is not a JSON object".to_owned()));
        }
        serde_json::from_value(value)
            .map_err(|e| HostError::Protocol(format!("response envelope: {e}")))
    }

    /// Round trip plus the `ok` check: the engine's `result` on success,
    /// [`HostError::Rpc`] when the engine reported a failure.
    pub async fn call_ok(&self, method: &str, args: Value) -> Result<Value, HostError> {
        let response = self.call(method, args).await?;
        if response.ok {
            Ok(response
                .result
                .unwrap_or_else(|| Value::Object(serde_json::Map::new())))
        } else {
            Err(HostError::Rpc(
                response
                    .error
                    .unwrap_or_else(|| "unspecified engine error".to_owned()),
            ))
        }
    }
}

/// Client-chosen request id: random, nonzero, small enough to survive
/// any peer's JSON number handling.
fn request_id() -> u64 {
    rand::thread_rng().gen_range(1..=u64::from(u32::MAX))
}
