// engine: scriptlink script-engine server binary.
//
// Serves framed-JSON RPC on a bounded worker pool, wired to the
// EchoEngine evaluator stub.  Embedders with a real evaluator build
// their own binary against the library crate.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "engine", about = "scriptlink script-engine server")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = engine::config::DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    // Initialize tracing subscriber for structured logging to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!(version = env!("CARGO_PKG_VERSION"), "engine starting");

    let mut cfg = if args.config.exists() {
        match engine::config::load_config(&args.config) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("FATAL: failed to load config: {e}");
                std::process::exit(1);
            }
        }
    } else {
        engine::config::EngineConfig::default()
    };
    if let Some(bind) = args.bind {
        cfg.server.bind = bind;
    }
    info!(
        bind = %cfg.server.bind,
        pool_size = cfg.server.pool_size,
        max_events_kept = cfg.bus.max_events_kept,
        "config loaded"
    );

    let bus = Arc::new(engine::bus::EventBus::new(cfg.bus.max_events_kept));
    let dispatcher = Arc::new(engine::dispatch::Dispatcher::new(
        Arc::new(engine::eval::EchoEngine),
        Arc::clone(&bus),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    if cfg.bus.heartbeat_ms > 0 {
        tokio::spawn(engine::server::run_heartbeat(
            Arc::clone(&bus),
            Duration::from_millis(cfg.bus.heartbeat_ms),
            shutdown_rx.clone(),
        ));
    }
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let listener = match tokio::net::TcpListener::bind(&cfg.server.bind).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("FATAL: bind {}: {e}", cfg.server.bind);
            std::process::exit(1);
        }
    };
    if let Err(e) = engine::server::serve(listener, dispatcher, cfg.server.pool_size, shutdown_rx).await
    {
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}
