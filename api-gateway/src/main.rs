// api-gateway/src/main.rs

//! API gateway binary.
//!
//! This binary exposes a small HTTP API on top of the `blocktree` crate:
//!
//! - `GET /health`
//! - `POST /headers`
//! - `GET /chain/tip`
//! - `GET /chain/blocks/{hash}`
//!
//! It embeds a `DefaultBlockTree` (RocksDB-backed, genesis seeded on
//! open) and a Prometheus metrics exporter on `/metrics`.

mod config;
mod routes;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::signal;

use blocktree::{BlockTree, MetricsRegistry, NodeConfig, RocksDbStore, run_prometheus_http_server};
use config::ApiConfig;
use routes::{chain, headers, health};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_gateway=info,blocktree=info".to_string()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    // For now we use default configs. These can be externalised later.
    let api_cfg = ApiConfig::default();
    let node_cfg = NodeConfig::default();

    // ---------------------------
    // Metrics
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    // Metrics exporter.
    if node_cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = node_cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                eprintln!("metrics HTTP server error: {e}");
            }
        });
        tracing::info!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Storage + block tree
    // ---------------------------

    let store = RocksDbStore::open(&node_cfg.storage).map_err(|e| {
        format!(
            "failed to open RocksDB store at {}: {e}",
            node_cfg.storage.path
        )
    })?;

    let tree = BlockTree::open(node_cfg.network, store)
        .map_err(|e| format!("failed to open block tree: {e}"))?;

    tracing::info!(
        genesis = %tree.params().genesis_hash().to_display_hex(),
        "block tree open"
    );

    // ---------------------------
    // Shared state
    // ---------------------------

    let app_state: SharedState = Arc::new(AppState {
        tree: tokio::sync::Mutex::new(tree),
        metrics: metrics.clone(),
    });

    // ---------------------------
    // HTTP router
    // ---------------------------

    let app = Router::new()
        .route("/health", get(health::health))
        .route("/headers", post(headers::submit_header))
        .route("/chain/tip", get(chain::best_tip))
        .route("/chain/blocks/{hash}", get(chain::block_by_hash))
        .with_state(app_state);

    // ---------------------------
    // axum 0.8 server (hyper 1 / tokio 1.48 style)
    // ---------------------------

    tracing::info!("API gateway listening on http://{}", api_cfg.listen_addr);

    let listener = tokio::net::TcpListener::bind(api_cfg.listen_addr)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", api_cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("API server error: {e}"))?;

    Ok(())
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
