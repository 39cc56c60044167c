//! Prometheus metrics for the ingestion pipeline and the read fan-out.
//!
//! Recording goes through the `metrics` facade, so it is a no-op until a
//! recorder is installed. [`MetricsServer::start`] installs the Prometheus
//! recorder and, when given an address, serves `/metrics` over HTTP.
//!
//! # Example
//!
//! ```rust,no_run
//! use recipe_catalog_runtime::metrics::MetricsServer;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! # Ok(())
//! # }
//! ```

use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub use metrics::{counter, gauge, histogram};

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
}

/// Prometheus metrics server.
///
/// Exposes metrics on an HTTP endpoint for Prometheus scraping.
pub struct MetricsServer {
    addr: SocketAddr,
    handle: Option<PrometheusHandle>,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self { addr, handle: None }
    }

    /// Install the Prometheus recorder and start the HTTP listener.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    /// A recorder that is already installed (common in tests) is tolerated.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        register_metrics();

        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[
                    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
                ],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        let (recorder, exporter) = builder
            .build()
            .map_err(|e| MetricsError::Build(e.to_string()))?;
        let handle = recorder.handle();

        match metrics::set_global_recorder(recorder) {
            Ok(()) => {
                let addr = self.addr;
                tokio::spawn(async move {
                    // `ExporterError` carries no printable detail
                    if exporter.await.is_err() {
                        tracing::error!(addr = %addr, "Metrics HTTP listener stopped");
                    }
                });
                self.handle = Some(handle);
                tracing::info!(
                    addr = %self.addr,
                    "Metrics recorder installed - scrape at http://{}/metrics",
                    self.addr
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Metrics recorder already initialized, skipping re-initialization");
                Ok(())
            }
        }
    }

    /// Get the metrics handle for rendering.
    #[must_use]
    pub const fn handle(&self) -> Option<&PrometheusHandle> {
        self.handle.as_ref()
    }

    /// Render current metrics in Prometheus text format.
    ///
    /// Returns `None` if this server did not install the recorder.
    #[must_use]
    pub fn render(&self) -> Option<String> {
        self.handle.as_ref().map(PrometheusHandle::render)
    }
}

fn register_metrics() {
    // Ingestion
    describe_counter!(
        "ingest_submitted_total",
        "Total number of reviews accepted onto the ingestion queue"
    );
    describe_counter!(
        "ingest_processed_total",
        "Total number of queue entries taken by the aggregation worker"
    );
    describe_counter!(
        "ingest_insert_failures_total",
        "Total number of reviews dropped because the insert failed"
    );
    describe_counter!(
        "ingest_recompute_failures_total",
        "Total number of aggregate recomputes that failed after a successful insert"
    );
    describe_gauge!(
        "ingest_queue_depth",
        "Number of reviews waiting on the ingestion queue"
    );
    describe_histogram!(
        "ingest_process_duration_seconds",
        "Time taken to insert one review and refresh its aggregate"
    );

    // Fan-out
    describe_counter!(
        "fanout_fetches_total",
        "Total number of per-recipe review fetches started"
    );
    describe_counter!(
        "fanout_fetch_failures_total",
        "Total number of per-recipe review fetches that failed, timed out or were cancelled"
    );
    describe_histogram!(
        "fanout_assemble_duration_seconds",
        "Time taken to attach reviews to a page of recipes"
    );

    // Recorded by the web and postgres crates
    describe_counter!("http_requests_total", "HTTP requests by method and status");
    describe_histogram!("http_request_duration_seconds", "HTTP request latency by method");
    describe_histogram!(
        "postgres_query_duration_seconds",
        "PostgreSQL query latency by operation"
    );
}

/// Ingestion pipeline metrics recorder.
pub struct IngestMetrics;

impl IngestMetrics {
    /// Record a review accepted onto the queue.
    pub fn record_submitted() {
        counter!("ingest_submitted_total").increment(1);
    }

    /// Record a queue entry fully handled by the worker.
    pub fn record_processed(duration: Duration) {
        counter!("ingest_processed_total").increment(1);
        histogram!("ingest_process_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record a dropped review.
    pub fn record_insert_failure() {
        counter!("ingest_insert_failures_total").increment(1);
    }

    /// Record a stale aggregate.
    pub fn record_recompute_failure() {
        counter!("ingest_recompute_failures_total").increment(1);
    }

    /// Record the current queue depth.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_depth(depth: usize) {
        gauge!("ingest_queue_depth").set(depth as f64);
    }
}

/// Read fan-out metrics recorder.
pub struct FanoutMetrics;

impl FanoutMetrics {
    /// Record a fetch being started.
    pub fn record_fetch() {
        counter!("fanout_fetches_total").increment(1);
    }

    /// Record a fetch that produced no reviews because it failed.
    pub fn record_fetch_failure() {
        counter!("fanout_fetch_failures_total").increment(1);
    }

    /// Record a completed assembly.
    pub fn record_assemble(duration: Duration) {
        histogram!("fanout_assemble_duration_seconds").record(duration.as_secs_f64());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_metrics_server_creation() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let server = MetricsServer::new(addr);
        assert!(server.handle().is_none());
        assert!(server.render().is_none());
    }

    #[tokio::test]
    async fn test_metrics_server_render() {
        let addr = "127.0.0.1:0".parse().unwrap();
        let mut server = MetricsServer::new(addr);
        server.start().unwrap();

        IngestMetrics::record_submitted();
        IngestMetrics::record_processed(Duration::from_millis(3));
        FanoutMetrics::record_fetch();

        // The handle is only set by whichever test installed the recorder first.
        if let Some(rendered) = server.render() {
            assert!(rendered.contains("ingest_submitted_total"));
            assert!(rendered.contains("fanout_fetches_total"));
        }
    }
}
