// =============================================================================
// Fundy Engine — Main Entry Point
// =============================================================================
//
// Multi-timeframe trend and sentiment analysis for USDT-margined perpetual
// futures, served over a read-only HTTP API. Market data comes from the
// public Bitget REST endpoints.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analysis;
mod api;
mod app_state;
mod bitget;
mod error;
mod futures_intel;
mod indicators;
mod market_data;
mod runtime_config;
mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::bitget::BitgetClient;
use crate::runtime_config::{RuntimeConfig, CONFIG_FILE};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Fundy Engine starting up");

    let config_present = Path::new(CONFIG_FILE).exists();
    let mut config = RuntimeConfig::load(CONFIG_FILE).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Leave a template next to the binary for operators to edit.
    if !config_present {
        if let Err(e) = config.save(CONFIG_FILE) {
            warn!(error = %e, "Failed to write default config");
        }
    }

    config.apply_env_overrides();

    info!(
        base_url = %config.base_url,
        product_type = %config.product_type,
        max_bars_per_call = config.max_bars_per_call,
        "Upstream configured"
    );

    // ── 2. Upstream client & shared state ────────────────────────────────
    let client = Arc::new(BitgetClient::from_config(&config)?);
    let bind_addr = config.bind_addr.clone();
    let state = Arc::new(AppState::new(config, client));

    // ── 3. API server ────────────────────────────────────────────────────
    let app = api::rest::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind API server on {bind_addr}"))?;
    info!(addr = %bind_addr, "API server listening");

    // ── 4. Serve until Ctrl+C ────────────────────────────────────────────
    let served = axum::serve(listener, app).with_graceful_shutdown(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for shutdown signal");
        }
        warn!("Shutdown signal received, stopping gracefully");
    });

    if let Err(e) = served.await {
        error!(error = %e, "API server failed");
        return Err(e.into());
    }

    info!(
        analyses_served = state.analyses_served.load(std::sync::atomic::Ordering::Relaxed),
        uptime_secs = state.uptime_secs(),
        "Fundy Engine shut down complete."
    );
    Ok(())
}
