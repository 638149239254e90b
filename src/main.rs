//! Chat gate server.
//!
//! ```text
//!   client ──▶ request-id ─▶ trace ─▶ timeout ─▶ identity ─▶ ┌──────────── gate ─────────────┐ ─▶ handlers
//!                                                            │ logger → time_gate → role →   │      │
//!                                                            │ rate_limit (order from config)│      ▼
//!                                                            └───────────────────────────────┘  messaging
//!                                                                                              (edit history,
//!                                                                                               notifications)
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use chat_gate::clock::SystemClock;
use chat_gate::config::{load_config, watcher::ConfigWatcher, GateConfig};
use chat_gate::http::{Dependencies, HttpServer};
use chat_gate::lifecycle::{wait_for_termination, Shutdown};
use chat_gate::messaging::InMemoryStore;
use chat_gate::observability::{logging, metrics, FileSink, LogSink};

#[derive(Parser)]
#[command(name = "chat-gate")]
#[command(about = "Rate-limited, time-gated chat messaging server", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the gate pipeline when the config file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("chat-gate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit = config.rate_limit.count,
        window_secs = config.rate_limit.window_secs,
        access_window = config.access_window.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let snapshot_path = config.storage.snapshot_path.as_ref().map(PathBuf::from);
    let store = match &snapshot_path {
        Some(path) => Arc::new(InMemoryStore::load_from_file(path)?),
        None => Arc::new(InMemoryStore::new()),
    };

    let mut log_writer = None;
    let log_sink: Option<Arc<dyn LogSink>> = if config.request_log.enabled {
        let (sink, writer) = FileSink::open(Path::new(&config.request_log.path))?;
        log_writer = Some(writer);
        Some(Arc::new(sink))
    } else {
        None
    };

    let (config_tx, config_updates) = mpsc::unbounded_channel();
    let _watcher = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            tokio::spawn(async move {
                while let Some(update) = updates.recv().await {
                    if config_tx.send(update).is_err() {
                        break;
                    }
                }
            });
            Some(handle)
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(
        config,
        Dependencies {
            clock: Arc::new(SystemClock),
            store: store.clone(),
            log_sink,
        },
    );

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));

    wait_for_termination().await;
    shutdown.trigger();
    server_task.await??;

    if let Some(path) = &snapshot_path {
        if let Err(e) = store.save_to_file(path) {
            tracing::error!(error = %e, "Failed to save message snapshot");
        }
    }

    // The server held the last sink clones; give the writer time to drain.
    if let Some(writer) = log_writer {
        if tokio::time::timeout(Duration::from_secs(5), writer).await.is_err() {
            tracing::warn!("Request log writer did not finish in time");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
