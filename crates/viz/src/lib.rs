//! Vizceral traffic graph service
//!
//! Serves the service-to-service traffic graph built from a Prometheus
//! instant query, along with health probes and self-metrics.

pub mod api;
pub mod config;

/// Service name used in structured logs
pub const SERVICE_NAME: &str = "traffic-viz";
