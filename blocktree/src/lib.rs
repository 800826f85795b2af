//! Block-tree library crate.
//!
//! This crate provides the core building blocks for a node's local view
//! of a Bitcoin-style block tree:
//!
//! - strongly-typed domain types (`types`),
//! - the difficulty codec, chain/orphan data model, and header
//!   acceptance pipeline (`chain`),
//! - storage backends (`storage`),
//! - Prometheus-based metrics (`metrics`),
//! - and a top-level node configuration (`config`).
//!
//! Higher-level binaries can compose these pieces to build header-sync
//! nodes, gateways, and experiment harnesses. Full consensus validation
//! (proof-of-work re-verification, transaction and script checking) is
//! deliberately out of scope: the tree tracks ancestry and relative work
//! to answer "what is the current best tip" and "is this block known".

pub mod chain;
pub mod config;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-export top-level configuration types.
pub use config::{MetricsConfig, NodeConfig};

// Re-export "core" chain types and traits.
pub use chain::{
    BlockTree, ChainBlock, ChainError, ChainStore, InsertError, InsertionOutcome, NetworkParams,
    OrphanBlock, OrphanPool, StoreError,
};

// Re-export storage backends.
pub use storage::{InMemoryStore, RocksDbConfig, RocksDbStore};

// Re-export metrics registry and acceptance metrics.
pub use metrics::{AcceptMetrics, MetricsRegistry, run_prometheus_http_server};

// Re-export domain types at the crate root for convenience.
pub use types::*;

/// Type alias for the default persistent store backend.
pub type DefaultStore = RocksDbStore;

/// Type alias for the default block tree over the persistent backend.
pub type DefaultBlockTree = BlockTree<DefaultStore>;
