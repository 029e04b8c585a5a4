//! In-process engine server on an ephemeral local port.

use engine::bus::EventBus;
use engine::dispatch::Dispatcher;
use engine::eval::ScriptEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct TestServer {
    addr: SocketAddr,
    bus: Arc<EventBus>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TestServer {
    /// Starts a server with the default retention cap.
    pub async fn start(engine: Arc<dyn ScriptEngine>) -> std::io::Result<Self> {
        Self::start_with_retention(engine, engine::bus::DEFAULT_MAX_EVENTS_KEPT).await
    }

    pub async fn start_with_retention(
        engine: Arc<dyn ScriptEngine>,
        max_events_kept: usize,
    ) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let bus = Arc::new(EventBus::new(max_events_kept));
        let dispatcher = Arc::new(Dispatcher::new(engine, Arc::clone(&bus)));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let pool_size = engine::server::DEFAULT_POOL_SIZE;
            if let Err(e) = engine::server::serve(listener, dispatcher, pool_size, shutdown_rx).await {
                eprintln!("test server: {e}");
            }
        });
        Ok(TestServer {
            addr,
            bus,
            shutdown: shutdown_tx,
            task,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port` string for [`sl_host`] transports and sessions.
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    /// Direct bus access for seeding events in tests.
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
