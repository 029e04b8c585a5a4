//! TCP acceptor and per-connection worker loop.
//!
//! A semaphore with `pool_size` permits bounds concurrent connections;
//! the permit is taken *before* `accept`, so a saturated pool leaves
//! new connections waiting in the accept backlog.  Server-side
//! connections are persistent: one worker serves sequential requests on
//! its socket until EOF or error.

use crate::dispatch::Dispatcher;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use sl_protocol::{FrameCodec, FrameError, Request};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, watch};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

pub const DEFAULT_POOL_SIZE: usize = 4;

/// Accept loop.  Returns when the shutdown flag flips; in-flight
/// connections drain on their own tasks.
pub async fn serve(
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
    pool_size: usize,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<()> {
    let pool = Arc::new(Semaphore::new(pool_size));
    info!(addr = %listener.local_addr()?, pool_size, "engine listening");
    loop {
        // Take the permit first: a saturated pool must leave new
        // connections in the accept backlog, not in open sockets.
        let permit = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            permit = Arc::clone(&pool).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };
        let (stream, peer) = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            },
        };
        debug!(%peer, "connection accepted");
        let dispatcher = Arc::clone(&dispatcher);
        let conn_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _permit = permit;
            match serve_connection(stream, dispatcher, conn_shutdown).await {
                Ok(()) => debug!(%peer, "connection closed"),
                Err(e) => debug!(%peer, error = %e, "connection ended"),
            }
        });
    }
    info!("engine acceptor stopped");
    Ok(())
}

/// Worker loop: read frame, decode, dispatch, write response frame.
/// Handler failures become error responses; only frame and socket
/// errors end the connection.
async fn serve_connection(
    stream: TcpStream,
    dispatcher: Arc<Dispatcher>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), FrameError> {
    let mut framed = Framed::new(stream, FrameCodec::new());
    loop {
        let frame = tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            frame = framed.next() => match frame {
                // Clean EOF on the frame header.
                None => break,
                Some(Ok(frame)) => frame,
                Some(Err(e)) => return Err(e),
            },
        };
        let response = match serde_json::from_slice::<Request>(&frame) {
            Ok(request) => dispatcher.handle(request),
            Err(e) => {
                warn!(error = %e, "undecodable request payload");
                Dispatcher::undecodable(&e)
            }
        };
        match serde_json::to_vec(&response) {
            Ok(payload) => framed.send(Bytes::from(payload)).await?,
            Err(e) => warn!(error = %e, "encode response"),
        }
    }
    Ok(())
}

/// Emits a `heartbeat` bus event every `interval` until shutdown.
/// Spawned only when the configured interval is nonzero.
pub async fn run_heartbeat(
    bus: Arc<crate::bus::EventBus>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(interval) => {
                let seq = bus.emit("heartbeat", Value::Null);
                debug!(seq, "heartbeat");
            }
        }
    }
}
