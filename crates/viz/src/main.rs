//! Traffic Viz - Vizceral traffic graph server
//!
//! Queries Prometheus for service-to-service request metrics on every
//! request and serves the resulting graph at `/vizceral`.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use traffic_viz::{api, config::VizConfig, SERVICE_NAME};
use viz_lib::{
    health::{components, HealthRegistry},
    observability::StructuredLogger,
    query::PrometheusClient,
};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = VizConfig::load()?;
    info!(
        prometheus_host = %config.prometheus_host,
        prometheus_port = config.prometheus_port,
        metric = %config.metric_name(),
        "Service configured"
    );

    let client = PrometheusClient::from_host_port(
        &config.prometheus_host,
        config.prometheus_port,
        config.query(),
        config.query_timeout(),
    )
    .context("Failed to create Prometheus client")?;
    let endpoint = client.endpoint().to_string();

    let logger = StructuredLogger::new(SERVICE_NAME);
    logger.log_startup(SERVICE_VERSION, &endpoint, &config.metric_shape.to_string());

    let health_registry = HealthRegistry::new();
    health_registry.register(components::PROMETHEUS).await;
    health_registry.register(components::GRAPH_BUILDER).await;

    let app_state = Arc::new(api::AppState::new(
        Arc::new(client),
        config.graph_options(),
        health_registry.clone(),
        endpoint,
    ));

    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    api::serve(config.api_port, app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutting down");
    Ok(())
}
