//! purplefox Server
//!
//! Run with: cargo run --bin purplefox
//!
//! # Configuration
//!
//! Environment variables (also read from `.env.local` and `.env`):
//! - `SUPABASE_URL`: Hosted backend endpoint (required)
//! - `SUPABASE_KEY`: Hosted backend API key (required)
//! - `PURPLEFOX_ENV`: `development` or `production` (default: build profile)
//! - `PURPLEFOX_HISTORY`: `path` or `hash` (default: path)
//! - `PURPLEFOX_HOST` / `PURPLEFOX_PORT`: Bind address (default: 0.0.0.0:8084)
//! - `RUST_LOG`: Log filter (default: purplefox=info)

use anyhow::Context;
use clap::Parser;
use purplefox::api::{serve, AppState};
use purplefox::backend::{BackendClient, MemoryStore, TableStore};
use purplefox::config::Config;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "purplefox")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tournament table status tracker")]
struct Args {
    /// Config file (default: ./purplefox.toml or the user config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep rows in memory instead of the hosted backend
    #[arg(long)]
    offline: bool,

    /// Port to listen on, overriding configuration
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config =
        Config::load_default(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.api.port = port;
    }

    purplefox::logging::init(&config.logging);

    tracing::info!("Starting purplefox v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn TableStore> = if args.offline {
        tracing::warn!("Offline mode: table status is kept in memory only");
        Arc::new(MemoryStore::new())
    } else {
        let client = BackendClient::from_config(&config.backend)
            .context("Cannot start without backend credentials")?;
        tracing::info!(url = %client.url(), table = %config.backend.table, "Backend client ready");

        match client.health_check().await {
            Ok(()) => tracing::info!("Backend connection verified"),
            Err(e) => tracing::warn!(error = %e, "Backend not reachable yet"),
        }

        match client.realtime_listener() {
            Some(listener) => {
                tracing::info!(topic = %listener.topic(), "Starting realtime subscription");
                listener.spawn();
            }
            None => tracing::info!("Realtime disabled; only local writes are broadcast"),
        }

        Arc::new(client)
    };

    let state = AppState::new(Arc::clone(&store), &config);
    Arc::clone(&state.ws_hub).forward_changes(store.subscribe());

    tracing::info!(
        history = ?config.router.history,
        base = %state.routes.base(),
        "Mounting views"
    );

    serve(state).await?;

    tracing::info!("purplefox stopped");
    Ok(())
}
