//! HTTP API: traffic graph, health checks and Prometheus metrics

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use viz_lib::{
    error::{FetchError, GraphError},
    graph::{build_graph, GraphOptions, TrafficGraph},
    health::{components, ComponentStatus, HealthRegistry},
    observability::{StructuredLogger, VizMetrics},
    query::MetricsSource,
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn MetricsSource>,
    pub options: GraphOptions,
    pub health_registry: HealthRegistry,
    pub metrics: VizMetrics,
    pub logger: StructuredLogger,
    pub endpoint: String,
}

impl AppState {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        options: GraphOptions,
        health_registry: HealthRegistry,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            source,
            options,
            health_registry,
            metrics: VizMetrics::new(),
            logger: StructuredLogger::new(crate::SERVICE_NAME),
            endpoint: endpoint.into(),
        }
    }
}

/// Graph request failure mapped onto an HTTP status
#[derive(Debug)]
pub struct ApiError(GraphError);

impl From<GraphError> for ApiError {
    fn from(err: GraphError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            GraphError::Fetch(FetchError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            GraphError::Fetch(_) => StatusCode::BAD_GATEWAY,
            GraphError::Sample { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

/// Fetch one snapshot and turn it into a traffic graph
async fn vizceral(State(state): State<Arc<AppState>>) -> Result<Json<TrafficGraph>, ApiError> {
    state.metrics.inc_graph_requests();

    let fetch_started = Instant::now();
    let fetched = state.source.fetch().await;
    let fetch_secs = fetch_started.elapsed().as_secs_f64();
    state.metrics.observe_fetch_latency(fetch_secs);

    let response = match fetched {
        Ok(response) => {
            state.health_registry.record_backend_success().await;
            response
        }
        Err(err) => {
            state.metrics.inc_fetch_errors();
            state
                .logger
                .log_fetch_failed(&state.endpoint, &err.to_string());
            state
                .health_registry
                .record_backend_failure(err.to_string())
                .await;
            return Err(GraphError::Fetch(err).into());
        }
    };

    let build_started = Instant::now();
    let build = match build_graph(&response, &state.options) {
        Ok(build) => build,
        Err(err) => {
            state.logger.log_build_failed(&err.to_string());
            state
                .health_registry
                .set_degraded(components::GRAPH_BUILDER, err.to_string())
                .await;
            return Err(err.into());
        }
    };
    let build_secs = build_started.elapsed().as_secs_f64();
    state.metrics.observe_build_latency(build_secs);

    for skipped in &build.skipped {
        state
            .logger
            .log_sample_skipped(skipped.index, &skipped.error.to_string());
    }

    let skipped_samples = build.skipped_samples();
    if skipped_samples > 0 {
        state.metrics.add_skipped_samples(skipped_samples);
        state
            .health_registry
            .set_degraded(
                components::GRAPH_BUILDER,
                format!("skipped {} malformed samples", skipped_samples),
            )
            .await;
    } else {
        state
            .health_registry
            .set_healthy(components::GRAPH_BUILDER)
            .await;
    }

    let graph = build.graph;
    state
        .metrics
        .set_graph_size(graph.nodes.len(), graph.connections.len());
    state.logger.log_graph_built(
        graph.nodes.len(),
        graph.connections.len(),
        skipped_samples,
        fetch_secs,
        build_secs,
    );

    Ok(Json(graph))
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 if ready, 503 if not ready
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus metrics endpoint
async fn metrics() -> Response {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(err) = encoder.encode(&metric_families, &mut buffer) {
        return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/vizceral", get(vizceral))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(port: u16, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
