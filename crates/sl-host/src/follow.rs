//! Background cursor-polling loop.
//!
//! One driver per session at most; starting a new one stops the
//! previous first.  Events reach the sink in strictly ascending seq
//! order, and the shared cursor advances past each observed seq so
//! duplicates cannot be delivered.  Loss across an engine restart is
//! possible and is not detected here.

use crate::session::poll_events;
use crate::sinks::{EventSink, LogSink};
use crate::transport::RpcTransport;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Floor for the error back-off sleep.
const MIN_BACKOFF: Duration = Duration::from_millis(250);

pub(crate) struct FollowHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FollowHandle {
    pub(crate) fn spawn(
        transport: RpcTransport,
        cursor: Arc<AtomicU64>,
        event_sink: Arc<dyn EventSink>,
        log_sink: Arc<dyn LogSink>,
        interval: Duration,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(follow_loop(
            transport,
            cursor,
            event_sink,
            log_sink,
            interval,
            shutdown_rx,
        ));
        FollowHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Clears the running flag, interrupts the sleep, and joins.
    pub(crate) async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

async fn follow_loop(
    transport: RpcTransport,
    cursor: Arc<AtomicU64>,
    event_sink: Arc<dyn EventSink>,
    log_sink: Arc<dyn LogSink>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        // Transient errors back off but never end the loop.
        let delay = match poll_events(&transport, &cursor, event_sink.as_ref()).await {
            Ok(delivered) => {
                if delivered > 0 {
                    debug!(events = delivered, "follow poll");
                }
                interval
            }
            Err(e) => {
                warn!(error = %e, "follow poll failed");
                log_sink.log(&format!("follow poll failed: {e}"));
                interval.max(MIN_BACKOFF)
            }
        };
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
    debug!("follow loop exited");
}
