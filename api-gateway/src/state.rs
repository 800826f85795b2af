//! Shared application state.

use std::sync::Arc;

use tokio::sync::Mutex;

use blocktree::{DefaultBlockTree, MetricsRegistry};

/// Shared state held by the API handlers.
///
/// This is wrapped in an [`Arc`] and passed to request handlers via
/// Axum's `State` extractor. The block tree sits behind a `Mutex`
/// because `accept` mutates the store through check-then-insert
/// sequences that must not interleave; the lock makes the gateway a
/// single logical writer per store instance.
pub struct AppState {
    /// Embedded block tree (storage + acceptance pipeline).
    pub tree: Mutex<DefaultBlockTree>,
    /// Metrics registry shared between the pipeline and the exporter.
    pub metrics: Arc<MetricsRegistry>,
}

/// Thread-safe alias for `AppState`.
pub type SharedState = Arc<AppState>;
