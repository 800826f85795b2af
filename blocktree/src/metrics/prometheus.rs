//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed acceptance metrics, and an
//! async HTTP exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{
    self, Encoder, Histogram, HistogramOpts, IntCounter, IntGauge, Opts, Registry, TextEncoder,
};

use crate::chain::InsertionOutcome;

/// Acceptance-pipeline Prometheus metrics.
///
/// These are registered into a [`Registry`] and updated by whatever
/// component drives `BlockTree::accept` (the gateway, the demo node).
#[derive(Clone)]
pub struct AcceptMetrics {
    /// Latency of a full `accept` call, cascade included, in seconds.
    pub accept_seconds: Histogram,
    /// Headers that extended a known block.
    pub headers_chained: IntCounter,
    /// Headers buffered because their parent is unknown.
    pub headers_orphaned: IntCounter,
    /// Headers whose hash was already recorded.
    pub headers_duplicate: IntCounter,
    /// Orphans promoted into the chain store by cascades.
    pub orphans_resolved: IntCounter,
    /// Height of the current best tip.
    pub best_tip_height: IntGauge,
    /// Number of orphans currently buffered.
    pub orphan_pool_size: IntGauge,
}

impl AcceptMetrics {
    /// Registers acceptance metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        // Accept latency, cascade included.
        let accept_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "accept_seconds",
                "Time to classify and insert one header, orphan cascade included, in seconds",
            )
            .buckets(vec![
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25,
            ]),
        )?;
        registry.register(Box::new(accept_seconds.clone()))?;

        let headers_chained = IntCounter::with_opts(Opts::new(
            "headers_chained_total",
            "Total headers that extended a known chain block",
        ))?;
        registry.register(Box::new(headers_chained.clone()))?;

        let headers_orphaned = IntCounter::with_opts(Opts::new(
            "headers_orphaned_total",
            "Total headers buffered while their parent is unknown",
        ))?;
        registry.register(Box::new(headers_orphaned.clone()))?;

        let headers_duplicate = IntCounter::with_opts(Opts::new(
            "headers_duplicate_total",
            "Total headers whose hash was already recorded",
        ))?;
        registry.register(Box::new(headers_duplicate.clone()))?;

        let orphans_resolved = IntCounter::with_opts(Opts::new(
            "orphans_resolved_total",
            "Total orphans promoted into the chain store by cascades",
        ))?;
        registry.register(Box::new(orphans_resolved.clone()))?;

        let best_tip_height = IntGauge::with_opts(Opts::new(
            "best_tip_height",
            "Height of the current best tip",
        ))?;
        registry.register(Box::new(best_tip_height.clone()))?;

        let orphan_pool_size = IntGauge::with_opts(Opts::new(
            "orphan_pool_size",
            "Number of orphans currently buffered",
        ))?;
        registry.register(Box::new(orphan_pool_size.clone()))?;

        Ok(Self {
            accept_seconds,
            headers_chained,
            headers_orphaned,
            headers_duplicate,
            orphans_resolved,
            best_tip_height,
            orphan_pool_size,
        })
    }

    /// Bumps the per-outcome counter for one accepted header. A chained
    /// outcome also credits `orphans_resolved` with the promotions its
    /// cascade performed.
    pub fn record_outcome(&self, outcome: &InsertionOutcome) {
        match outcome {
            InsertionOutcome::Chained { promoted_orphans, .. } => {
                self.headers_chained.inc();
                self.orphans_resolved.inc_by(*promoted_orphans);
            }
            InsertionOutcome::Orphaned(_) => self.headers_orphaned.inc(),
            InsertionOutcome::Duplicate => self.headers_duplicate.inc(),
        }
    }
}

/// Wrapper around a Prometheus registry and the acceptance metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub accept: AcceptMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the acceptance metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("blocktree".to_string()), None)?;
        let accept = AcceptMetrics::register(&registry)?;
        Ok(Self { registry, accept })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            eprintln!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
///
/// This function is `async` and is intended to be spawned onto a Tokio
/// runtime, e.g.:
///
/// ```ignore
/// let registry = Arc::new(MetricsRegistry::new()?);
/// let addr: SocketAddr = "127.0.0.1:9898".parse()?;
/// tokio::spawn(run_prometheus_http_server(registry.clone(), addr));
/// ```
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                eprintln!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainBlock, InsertionOutcome};
    use crate::types::{BlockHash, Hash256};

    #[test]
    fn registry_registers_and_gathers() {
        let registry = MetricsRegistry::new().expect("fresh registry");
        registry.accept.record_outcome(&InsertionOutcome::Duplicate);
        registry.accept.accept_seconds.observe(0.002);
        registry.accept.best_tip_height.set(42);

        let text = registry.gather_text();
        assert!(text.contains("blocktree_headers_duplicate_total"));
        assert!(text.contains("blocktree_best_tip_height 42"));
    }

    #[test]
    fn chained_outcome_credits_the_resolved_orphan_counter() {
        let registry = MetricsRegistry::new().expect("fresh registry");
        let block = ChainBlock {
            id: 2,
            hash: BlockHash(Hash256([0xab; 32])),
            height: 1,
            cumulative_log_difficulty: 0.0,
            previous_block: 1,
        };
        registry
            .accept
            .record_outcome(&InsertionOutcome::Chained { block, promoted_orphans: 3 });

        let text = registry.gather_text();
        assert!(text.contains("blocktree_headers_chained_total 1"));
        assert!(text.contains("blocktree_orphans_resolved_total 3"));
    }
}
