//! request-governor host binary.
//!
//! Serves a small echo application behind the governance pipeline.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────────┐
//!                         │                   GOVERNANCE PIPELINE                     │
//!                         │                                                           │
//!     Client Request      │  ┌───────┐   ┌──────────┐   ┌────────────┐   ┌─────────┐  │
//!     ────────────────────┼─▶│ audit │──▶│ temporal │──▶│ rate limit │──▶│  authz  │──┼──▶ Application
//!                         │  └───────┘   └────┬─────┘   └─────┬──────┘   └────┬────┘  │     Handler
//!                         │                   │               │               │       │
//!     Client Response     │                   ▼               ▼               ▼       │
//!     ◀───────────────────┼────────────── 403 Forbidden   429 + Retry-After  403      │
//!                         └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::{
    http::{Method, Uri},
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;

use request_governor::lifecycle::{signals, startup};
use request_governor::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "request-governor")]
#[command(about = "Request governance pipeline in front of an HTTP application", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

async fn echo(method: Method, uri: Uri) -> String {
    format!("{} {}\n", method, uri.path())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match startup::load_startup_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if cli.check {
        println!("Configuration OK");
        return Ok(());
    }

    startup::init_observability(&config);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "request-governor starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_requests = config.rate_limit.max_requests,
        window_seconds = config.rate_limit.window_seconds,
        audit_sink = %config.audit.sink_path,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let app = Router::new().fallback(echo);
    let server = HttpServer::new(config, app)?;

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(&shutdown);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
