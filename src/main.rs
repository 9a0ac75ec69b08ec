//! Loop breaker service.
//!
//! # Architecture Overview
//!
//! ```text
//!     CloudEvent        ┌──────────┐     ┌──────────────────────────┐
//!     ─────────────────▶│   http   │────▶│         breaker          │
//!     202 / echo        │ receiver │     │  window counter + state  │
//!     ◀─────────────────│          │     └──────┬────────────▲──────┘
//!                       └──────────┘            │ trip       │ reset
//!                                               ▼            │
//!                                       ┌──────────────┐ ┌───┴──────┐
//!                                       │ remediation  │ │  reset   │
//!                                       │ k8s/webhook  │ │  loop    │
//!                                       └──────────────┘ └──────────┘
//!
//!     Cross-cutting: config, lifecycle (signals, shutdown), observability, admin
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use loop_breaker::config;
use loop_breaker::http::HttpServer;
use loop_breaker::lifecycle::{build_breaker, signals::spawn_signal_handler, Shutdown};
use loop_breaker::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "loop-breaker")]
#[command(about = "Trips on runaway event loops and remediates them", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults plus environment overrides apply without one.
    #[arg(short, long, env = "LOOP_BREAKER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = config::load(args.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "loop-breaker starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_events = config.threshold.max_events,
        window_secs = config.threshold.window_secs,
        remediation = ?config.remediation.kind,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let breaker = build_breaker(&config)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for events");

    let shutdown = Shutdown::new();
    let signals = spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, breaker);
    server.run(listener, shutdown).await?;
    signals.abort();

    tracing::info!("Shutdown complete");
    Ok(())
}
