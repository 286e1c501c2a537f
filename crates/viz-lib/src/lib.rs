//! Traffic graph library for the Vizceral traffic monitor
//!
//! This crate provides the core functionality for:
//! - Normalizing Prometheus instant-query samples
//! - Aggregating service-to-service traffic into a node/edge graph
//! - Fetching query results from the Prometheus HTTP API
//! - Health checks and observability

pub mod error;
pub mod graph;
pub mod health;
pub mod observability;
pub mod query;

pub use error::{FetchError, GraphError, SampleError};
pub use graph::{
    build_graph, BucketSequence, Connection, GraphBuild, GraphOptions, Node, RenderMode,
    SamplePolicy, SkippedSample, TrafficGraph,
};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use observability::{StructuredLogger, VizMetrics};
pub use query::{MetricShape, MetricsSource, PrometheusClient, QueryResponse, RawSample};
