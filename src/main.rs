//! Local Lambda@Edge emulation proxy binary.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lambda_edge_proxy::config::{self, ProxyConfig, ReloadWatcher};
use lambda_edge_proxy::invoke::LambdaClient;
use lambda_edge_proxy::pipeline::Engine;
use lambda_edge_proxy::routing::RoutingTable;
use lambda_edge_proxy::server::ProxyServer;
use lambda_edge_proxy::{descriptor, observability};

#[derive(Debug, Parser)]
#[command(name = "lambda-edge-proxy", about = "Local Lambda@Edge emulation proxy")]
struct Args {
    /// Path to the TOML config file.
    #[arg(long, default_value = "lambda-edge-proxy.toml")]
    config: PathBuf,

    /// Lambda invocation endpoint URL (overrides the config file).
    #[arg(long)]
    endpoint: Option<String>,

    /// Deployment descriptor path (overrides the config file).
    #[arg(long)]
    descriptor: Option<PathBuf>,

    /// Listen address (overrides the config file).
    #[arg(long)]
    listen: Option<String>,

    /// Origin address to forward to (overrides the config file).
    #[arg(long)]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lambda_edge_proxy=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("lambda-edge-proxy v0.1.0 starting");

    let args = Args::parse();
    let mut config = if args.config.exists() {
        config::load_config(&args.config)?
    } else {
        tracing::info!(path = ?args.config, "no config file, using defaults");
        ProxyConfig::default()
    };
    if let Some(endpoint) = args.endpoint {
        config.lambda.endpoint = endpoint;
    }
    if let Some(path) = args.descriptor {
        config.descriptor.path = path.display().to_string();
    }
    if let Some(listen) = args.listen {
        config.listener.bind_address = listen;
    }
    if let Some(origin) = args.origin {
        config.origin.address = origin;
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        endpoint = %config.lambda.endpoint,
        descriptor = %config.descriptor.path,
        origin = %config.origin.address,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            observability::metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            );
        }
    }

    // Initial routing table. Descriptor problems mean "no routing
    // configured", never a refusal to start.
    let table = if config.descriptor.path.is_empty() {
        tracing::warn!("no descriptor configured, all requests pass through");
        RoutingTable::default()
    } else {
        match descriptor::load(Path::new(&config.descriptor.path)) {
            Ok(table) => table,
            Err(e) => {
                tracing::error!(error = %e, "descriptor load failed, starting with empty routing");
                RoutingTable::default()
            }
        }
    };

    let invoker = LambdaClient::new(
        &config.lambda.endpoint,
        Duration::from_secs(config.lambda.invoke_timeout_secs),
    )?;
    let engine = Arc::new(Engine::new(table, Box::new(invoker)));

    // Watchers feed one reload channel; the server applies the swaps.
    let (reload_tx, reload_rx) = mpsc::unbounded_channel();
    let mut watchers = Vec::new();
    if args.config.exists() {
        watchers.push(ReloadWatcher::config(&args.config, reload_tx.clone()).run()?);
    }
    if !config.descriptor.path.is_empty() {
        let path = PathBuf::from(&config.descriptor.path);
        if path.exists() {
            watchers.push(ReloadWatcher::descriptor(&path, reload_tx.clone()).run()?);
        }
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(());
        }
    });

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = ProxyServer::new(&config, engine);
    server.run(listener, reload_rx, shutdown_rx).await?;

    drop(watchers);
    tracing::info!("shutdown complete");
    Ok(())
}
