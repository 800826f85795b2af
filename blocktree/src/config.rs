//! Top-level configuration for a block-tree node.
//!
//! This module aggregates configuration for:
//!
//! - network parameters (genesis header, difficulty-1 reference),
//! - storage (RocksDB path and creation flags),
//! - metrics exporter (enable flag + listen address).
//!
//! The goal is to have a single `NodeConfig` struct that higher-level
//! binaries (the demo node, the API gateway) can construct from defaults
//! or environment variables as needed.

use std::net::SocketAddr;

use crate::chain::NetworkParams;
use crate::storage::RocksDbConfig;

/// Configuration for the Prometheus metrics exporter.
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Whether to run a `/metrics` HTTP exporter.
    pub enabled: bool,
    /// Address to bind the metrics HTTP server to.
    pub listen_addr: SocketAddr,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        // Safe to unwrap: this is a fixed, valid address literal.
        let addr: SocketAddr = "127.0.0.1:9898"
            .parse()
            .expect("hard-coded metrics listen address should parse");
        Self {
            enabled: true,
            listen_addr: addr,
        }
    }
}

/// Top-level configuration for a block-tree node.
///
/// This aggregates all the sub-configs needed to wire up a typical node:
///
/// - network pinning (`network`),
/// - persistent storage (`storage`),
/// - Prometheus metrics exporter (`metrics`).
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    pub network: NetworkParams,
    pub storage: RocksDbConfig,
    pub metrics: MetricsConfig,
}
