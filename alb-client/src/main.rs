//! Alb Client - Main entry point
//!
//! Starts a client from `ALTERNATOR_*` environment variables and reports
//! the node directory until interrupted.

use alb_client::AlternatorClient;
use alb_core::ClientConfig;
use anyhow::Context;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const STATUS_INTERVAL: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration from environment
    let config = ClientConfig::from_env().context("loading ALTERNATOR_* configuration")?;

    let client = AlternatorClient::connect(config)
        .await
        .context("starting Alternator client")?;

    let mut status = tokio::time::interval(STATUS_INTERVAL);
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("waiting for shutdown signal")?;
                break;
            }
            _ = status.tick() => {
                let snapshot = client.directory().get();
                info!(
                    nodes = snapshot.len(),
                    live = snapshot.live_nodes().count(),
                    generation = snapshot.generation(),
                    age_ms = snapshot.age().as_millis() as u64,
                    "Node directory"
                );
            }
        }
    }

    client.stop().await;
    Ok(())
}
