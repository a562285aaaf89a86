//! Pickgate - write-path enforcement gateway for the picks backend

use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pickgate::store::ContentRow;
use pickgate::{config::Args, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    // Parse command line arguments
    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("pickgate={},info", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Print startup banner
    info!("======================================");
    info!("  Pickgate - picks write-path gateway");
    info!("======================================");
    info!("Node ID: {}", args.node_id);
    info!("Listen: {}", args.listen);
    info!(
        "Mode: {}",
        if args.dev_mode { "DEVELOPMENT" } else { "PRODUCTION" }
    );
    info!("Rate limit: {}/min per identity", args.rate_limit_per_minute);
    info!("Event types: {}", args.event_types().len());
    info!("Clickout hosts: {}", args.clickout_hosts().len());
    info!("======================================");

    let state = Arc::new(server::AppState::new(args.clone())?);

    if args.seed_demo_content {
        seed_demo_content(&state);
    }

    server::run(state).await?;
    Ok(())
}

/// Seed a demo catalog entry and redirect so the pick and clickout
/// paths are exercisable end-to-end (dev mode only).
fn seed_demo_content(state: &server::AppState) {
    let row = ContentRow::new("test-game", "Test Game", "Seeded demo entry");
    let target_id = row.id;
    state.content_store.upsert(row);

    if let Some(host) = state.args.clickout_hosts().into_iter().next() {
        state.clickout.redirects().set(
            target_id,
            None,
            "main",
            &format!("https://{}/game/test-game", host),
        );
        info!("Seeded demo content 'test-game' ({}) with clickout via {}", target_id, host);
    } else {
        info!("Seeded demo content 'test-game' ({}); no clickout hosts configured", target_id);
    }
}
