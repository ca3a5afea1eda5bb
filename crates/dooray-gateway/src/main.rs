//! Dooray gateway server binary.

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use dooray_api::DoorayClient;
use dooray_transfer::{SessionStore, SystemClock, TransferManager};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod error;
mod routes;
mod upstream;

use config::GatewayConfig;
use routes::AppState;
use upstream::DoorayFileSource;

/// HTTP gateway exposing the Dooray API to LLM agents, with chunked
/// large-file downloads.
#[derive(Debug, Parser)]
#[command(name = "dooray-gateway", version)]
struct Args {
    /// Path to the gateway config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bind address, overriding the config file.
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse().context("failed to parse log directive")?),
        )
        .init();

    let args = Args::parse();
    let mut config = GatewayConfig::load(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    let client = Arc::new(DoorayClient::new(
        &config.dooray.base_url,
        &config.dooray.api_token,
    )?);
    let store = Arc::new(SessionStore::new(Arc::new(SystemClock)));
    let transfer = Arc::new(TransferManager::new(
        Arc::new(DoorayFileSource::new(client.clone())),
        store.clone(),
        config.transfer_config(),
    ));

    let idle_timeout = Duration::from_secs(config.transfer.idle_timeout_secs);
    let sweep_interval = Duration::from_secs(config.transfer.sweep_interval_secs);
    let sweeper = transfer.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = sweeper.evict_idle(idle_timeout);
            if !evicted.is_empty() {
                info!(count = evicted.len(), "evicted idle download sessions");
            }
        }
    });

    let app = routes::router(AppState { client, transfer });
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Drop every live session so spill files are removed before exit.
    store.teardown();
    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
}
