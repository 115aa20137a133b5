//! Signal analyst service entry point

use anyhow::{Context, Result};
use signal_analyst::cache::AnalysisCache;
use signal_analyst::config::{resolve_config_path, AnalystConfig};
use signal_analyst::credentials::CredentialRotator;
use signal_analyst::filters::default_chain;
use signal_analyst::notifier::TelegramNotifier;
use signal_analyst::oracle::OracleClient;
use signal_analyst::server::{serve, AppState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    info!("Starting signal analyst service");

    let config = AnalystConfig::load(resolve_config_path())
        .context("Failed to load analyst configuration")?;

    if config.api_token.is_empty() {
        warn!("No API token configured: request authentication is disabled");
    }
    if config.oracle.api_keys.is_empty() {
        warn!("No oracle API keys configured: analysis requests will fail");
    }

    let rotator = Arc::new(CredentialRotator::new(
        config.oracle.api_keys.clone(),
        Duration::from_secs(config.oracle.rotation_interval_secs),
    ));
    let oracle = OracleClient::new(config.oracle.clone(), Arc::clone(&rotator))
        .context("Failed to build oracle client")?;
    let notifier = Arc::new(TelegramNotifier::new(config.telegram.clone()));
    let cache = AnalysisCache::new(Duration::from_secs(config.cache_ttl_secs));
    let sweep_interval = Duration::from_secs(config.sweep_interval_secs);

    let state = Arc::new(AppState {
        config,
        cache,
        oracle,
        notifier,
        chain: default_chain(),
        started: Instant::now(),
    });

    // Opportunistic cache sweep, independent of request handling.
    let sweeper_state = Arc::clone(&state);
    let sweeper = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(sweep_interval);
        loop {
            ticker.tick().await;
            sweeper_state.cache.sweep();
        }
    });

    let server_state = Arc::clone(&state);
    let server = tokio::spawn(async move { serve(server_state).await });

    info!("Signal analyst running. Press Ctrl+C to stop.");
    signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down signal analyst");
    sweeper.abort();
    server.abort();

    Ok(())
}
