// src/main.rs
//
// Minimal demo node that wires up the blocktree library:
//
// - RocksDB-backed storage, genesis seeded on open
// - Prometheus metrics exporter on /metrics
// - A short out-of-order header sequence fed through the acceptance
//   pipeline to demonstrate orphan buffering and cascade resolution.

use std::sync::Arc;

use blocktree::{
    BlockHash, BlockHeader, BlockTree, Hash256, InsertionOutcome, MetricsRegistry, NodeConfig,
    RocksDbStore, run_prometheus_http_server,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run_node().await {
        eprintln!("fatal error: {err}");
        std::process::exit(1);
    }
}

async fn run_node() -> Result<(), String> {
    // For now, just use defaults. Later you can load from a file/CLI/env.
    let cfg = NodeConfig::default();

    // ---------------------------
    // Metrics registry + exporter
    // ---------------------------

    let metrics = Arc::new(
        MetricsRegistry::new()
            .map_err(|e| format!("failed to initialise metrics registry: {e}"))?,
    );

    if cfg.metrics.enabled {
        let metrics_clone = metrics.clone();
        let addr = cfg.metrics.listen_addr;
        tokio::spawn(async move {
            if let Err(e) = run_prometheus_http_server(metrics_clone, addr).await {
                eprintln!("metrics HTTP server error: {e}");
            }
        });
        eprintln!("metrics exporter listening on http://{}/metrics", addr);
    }

    // ---------------------------
    // Storage backend (RocksDB)
    // ---------------------------

    let store = RocksDbStore::open(&cfg.storage).map_err(|e| {
        format!(
            "failed to open RocksDB store at {}: {e}",
            cfg.storage.path
        )
    })?;

    // ---------------------------
    // Block tree (genesis seeded)
    // ---------------------------

    let mut tree = BlockTree::open(cfg.network, store)
        .map_err(|e| format!("failed to open block tree: {e}"))?;

    eprintln!(
        "block tree open, genesis {}",
        tree.params().genesis_hash().to_display_hex()
    );

    // ---------------------------
    // Out-of-order demo sequence
    // ---------------------------

    // Three headers on top of genesis, submitted child-first so the
    // first two are buffered and the third triggers the cascade.
    let genesis_hash = tree.params().genesis_hash();
    let bits = tree.params().genesis_header.bits;

    let h1 = demo_header(genesis_hash, 1, bits);
    let h2 = demo_header(h1.compute_hash(), 2, bits);
    let h3 = demo_header(h2.compute_hash(), 3, bits);

    for header in [&h3, &h2, &h1] {
        let start = std::time::Instant::now();
        let outcome = tree
            .accept(header)
            .map_err(|e| format!("accept failed: {e}"))?;
        metrics.accept.accept_seconds.observe(start.elapsed().as_secs_f64());
        metrics.accept.record_outcome(&outcome);

        println!(
            "accepted {} -> {}",
            header.compute_hash().to_display_hex(),
            outcome_name(&outcome),
        );
    }

    let tip = tree
        .best_tip()
        .map_err(|e| format!("best-tip query failed: {e}"))?
        .ok_or_else(|| "empty chain store after seeding".to_string())?;
    metrics.accept.best_tip_height.set(tip.height as i64);

    println!(
        "best tip height={} hash={} cumulative_log_difficulty={:.3}",
        tip.height,
        tip.hash.to_display_hex(),
        tip.cumulative_log_difficulty,
    );

    Ok(())
}

/// Builds a demo header on the given parent; `seed` varies the merkle
/// root so each header gets a distinct hash.
fn demo_header(parent: BlockHash, seed: u32, bits: blocktree::CompactTarget) -> BlockHeader {
    BlockHeader {
        version: 1,
        previous_block_hash: parent,
        merkle_root: Hash256::compute(&seed.to_le_bytes()),
        timestamp: 1_296_688_602 + seed,
        bits,
        nonce: seed,
    }
}

fn outcome_name(outcome: &InsertionOutcome) -> &'static str {
    match outcome {
        InsertionOutcome::Chained { .. } => "chained",
        InsertionOutcome::Orphaned(_) => "orphaned",
        InsertionOutcome::Duplicate => "duplicate",
    }
}
