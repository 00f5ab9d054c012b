//! Potluck Server
//!
//! Deposit-to-win competitions on Solana, served as blink actions.

mod api;
mod config;
mod server;
mod shutdown;
mod state;

use clap::Parser;
use config::ConfigLoader;
use potluck_core::framework::CompetitionRegistry;
use potluck_core::ledger::{LedgerGateway, SolanaGateway};
use potluck_core::processors::LifecycleEngine;
use potluck_core::service::CompetitionService;
use potluck_core::utils::clock::{Clock, SystemClock};
use server::{build_router, run_server};
use state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Potluck - deposit-to-win competitions as Solana actions
#[derive(Parser, Debug)]
#[command(name = "potluck-server")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "./potluck-config.toml")]
    config: PathBuf,

    /// Override the listen address (e.g., 0.0.0.0:3000)
    #[arg(short, long)]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    init_tracing();

    // Parse command line arguments
    let args = Args::parse();

    tracing::info!("Starting potluck-server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let loaded_config = ConfigLoader::new(&args.config, args.listen)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;
    tracing::info!("Configuration loaded from {:?}", args.config);

    let listen_addr = loaded_config.server.listen;
    let gateway: Arc<dyn LedgerGateway> = Arc::new(SolanaGateway::new(&loaded_config.ledger));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let registry = CompetitionRegistry::new();

    // Start the lifecycle engine
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine = LifecycleEngine::from_config(
        registry.clone(),
        gateway.clone(),
        clock.clone(),
        &loaded_config.competition,
    );
    let engine_handle = tokio::spawn(engine.run(shutdown_rx));

    // Create application state
    let service = CompetitionService::new(registry, gateway, clock, &loaded_config.competition);
    let state = AppState::new(service, loaded_config.actions);

    // Build the router
    let router = build_router(state);

    // Run the server
    tracing::info!("Starting HTTP server on {}", listen_addr);
    let result = run_server(router, listen_addr).await;

    // Stop the lifecycle engine
    let _ = shutdown_tx.send(true);
    if let Err(e) = engine_handle.await {
        tracing::error!("Lifecycle engine task failed: {}", e);
    }
    tracing::info!("Server shutdown complete");

    result.map_err(Into::into)
}

/// Initialize the tracing subscriber with environment-based filtering.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,potluck_core=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
