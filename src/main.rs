//! switchyard demo server.
//!
//! Serves a small route table until SIGINT/SIGTERM:
//!
//! ```text
//! GET  /health        → {"status":"ok"}
//! ALL  /echo[/*]      → the parsed request, as JSON
//! ```

use std::path::PathBuf;

use clap::Parser;
use serde_json::json;

use switchyard::config::{load_config, ServerConfig};
use switchyard::lifecycle::shutdown_signal;
use switchyard::observability::{init_logging, init_metrics};
use switchyard::{args, handler, Input, Next, Output, Server};

#[derive(Parser)]
#[command(name = "switchyard")]
#[command(about = "Ordered route table and middleware dispatch server", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable CORS for every route
    #[arg(long)]
    cors: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.listener.port = port;
    }
    if cli.cors {
        config.cors = true;
    }

    init_logging(&config.observability.log_level);

    tracing::info!(
        name = %config.name,
        bind_address = %config.listener.bind_address(),
        cors = config.cors,
        request_timeout_secs = ?config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let mut server = Server::new(config);
    let router = server.router_mut();
    router.get(args![
        "/health",
        handler(|_: Input, _: Next| async { Output::json(json!({ "status": "ok" })) })
    ])?;
    router.mount(args![
        "/echo",
        handler(|input: Input, _: Next| async move { Output::json(input.to_json()) })
    ])?;

    server.start().await?;
    tracing::info!(address = %server.address(), "Listening for connections");

    shutdown_signal().await;
    server.stop().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
