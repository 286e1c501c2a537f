//! Observability infrastructure for the graph service
//!
//! Provides:
//! - Prometheus self-metrics (query latency, build latency, graph size, errors)
//! - Structured JSON logging with tracing

use prometheus::{register_histogram, register_int_counter, register_int_gauge};
use prometheus::{Histogram, IntCounter, IntGauge};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for latency measurements (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<VizMetricsInner> = OnceLock::new();

struct VizMetricsInner {
    fetch_latency_seconds: Histogram,
    build_latency_seconds: Histogram,
    graph_nodes: IntGauge,
    graph_connections: IntGauge,
    graph_requests: IntCounter,
    fetch_errors: IntCounter,
    skipped_samples: IntCounter,
}

impl VizMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram!(
                "traffic_viz_fetch_latency_seconds",
                "Time spent waiting for the Prometheus instant query",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            build_latency_seconds: register_histogram!(
                "traffic_viz_build_latency_seconds",
                "Time spent turning a query result into a traffic graph",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register build_latency_seconds"),

            graph_nodes: register_int_gauge!(
                "traffic_viz_graph_nodes",
                "Number of nodes in the most recently served graph"
            )
            .expect("Failed to register graph_nodes"),

            graph_connections: register_int_gauge!(
                "traffic_viz_graph_connections",
                "Number of connections in the most recently served graph"
            )
            .expect("Failed to register graph_connections"),

            graph_requests: register_int_counter!(
                "traffic_viz_graph_requests_total",
                "Total number of graph requests served"
            )
            .expect("Failed to register graph_requests"),

            fetch_errors: register_int_counter!(
                "traffic_viz_fetch_errors_total",
                "Total number of failed Prometheus queries"
            )
            .expect("Failed to register fetch_errors"),

            skipped_samples: register_int_counter!(
                "traffic_viz_skipped_samples_total",
                "Total number of malformed samples skipped under the lenient policy"
            )
            .expect("Failed to register skipped_samples"),
        }
    }
}

/// Handle to the process-wide service metrics
///
/// Multiple clones share the same underlying metrics.
#[derive(Clone)]
pub struct VizMetrics {
    _private: (),
}

impl Default for VizMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl VizMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(VizMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &VizMetricsInner {
        GLOBAL_METRICS.get_or_init(VizMetricsInner::new)
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn observe_build_latency(&self, duration_secs: f64) {
        self.inner().build_latency_seconds.observe(duration_secs);
    }

    /// Record the size of a served graph
    pub fn set_graph_size(&self, nodes: usize, connections: usize) {
        self.inner().graph_nodes.set(nodes as i64);
        self.inner().graph_connections.set(connections as i64);
    }

    pub fn inc_graph_requests(&self) {
        self.inner().graph_requests.inc();
    }

    pub fn inc_fetch_errors(&self) {
        self.inner().fetch_errors.inc();
    }

    pub fn add_skipped_samples(&self, count: usize) {
        self.inner().skipped_samples.inc_by(count as u64);
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, endpoint: &str, shape: &str) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            prometheus_endpoint = %endpoint,
            metric_shape = %shape,
            "Traffic graph service started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Traffic graph service shutting down"
        );
    }

    pub fn log_graph_built(
        &self,
        nodes: usize,
        connections: usize,
        skipped_samples: usize,
        fetch_secs: f64,
        build_secs: f64,
    ) {
        info!(
            event = "graph_built",
            service = %self.service,
            nodes = nodes,
            connections = connections,
            skipped_samples = skipped_samples,
            fetch_secs = fetch_secs,
            build_secs = build_secs,
            "Built traffic graph"
        );
    }

    pub fn log_fetch_failed(&self, endpoint: &str, error: &str) {
        warn!(
            event = "fetch_failed",
            service = %self.service,
            prometheus_endpoint = %endpoint,
            error = %error,
            "Prometheus query failed"
        );
    }

    pub fn log_sample_skipped(&self, index: usize, error: &str) {
        warn!(
            event = "sample_skipped",
            service = %self.service,
            index = index,
            error = %error,
            "Skipping malformed sample"
        );
    }

    pub fn log_build_failed(&self, error: &str) {
        warn!(
            event = "build_failed",
            service = %self.service,
            error = %error,
            "Rejected malformed query result"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_handles_share_registry() {
        let metrics = VizMetrics::new();
        let other = metrics.clone();

        metrics.observe_fetch_latency(0.01);
        other.observe_build_latency(0.001);
        other.set_graph_size(4, 3);
        metrics.inc_graph_requests();
        metrics.inc_fetch_errors();
        metrics.add_skipped_samples(2);

        let families = prometheus::gather();
        let names: Vec<_> = families.iter().map(|f| f.get_name().to_string()).collect();
        assert!(names.contains(&"traffic_viz_graph_nodes".to_string()));
        assert!(names.contains(&"traffic_viz_fetch_latency_seconds".to_string()));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("traffic-viz");
        assert_eq!(logger.service, "traffic-viz");

        // No subscriber installed; events must not panic
        logger.log_sample_skipped(3, "missing required label 'destination'");
        logger.log_build_failed("malformed sample at index 0");
    }
}
