use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use filter_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use filter_gateway::lifecycle::{signals, Shutdown};
use filter_gateway::observability::{logging, metrics};
use filter_gateway::GatewayServer;

#[derive(Parser, Debug)]
#[command(name = "filter-gateway", version, about = "Filter-chain HTTP gateway")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload routes when the configuration file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init(&config.observability)?;
    tracing::info!("filter-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        dispatch_timeout_ms = config.timeouts.dispatch_ms,
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

    // Keep the watcher alive for the lifetime of the server.
    let mut _watcher = None;
    let updates = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            _watcher = Some(watcher.run()?);
            Some(rx)
        }
        _ => None,
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = GatewayServer::new(config)?;

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        signals::ctrl_c().await;
        shutdown.trigger();
    });

    server.run(listener, updates, signal).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
