//! Service configuration

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Duration;
use viz_lib::graph::{BucketSequence, GraphOptions, RenderMode, SamplePolicy};
use viz_lib::query::{instant_query, MetricShape};

/// Graph service configuration, read from `VIZ_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct VizConfig {
    /// Prometheus host
    #[serde(default = "default_prometheus_host")]
    pub prometheus_host: String,

    /// Prometheus port
    #[serde(default = "default_prometheus_port")]
    pub prometheus_port: u16,

    /// Port the graph API listens on
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Whether to query the latency histogram or the request counter
    #[serde(default)]
    pub metric_shape: MetricShape,

    /// Metric name override; defaults depend on `metric_shape`
    #[serde(default)]
    pub metric_name: Option<String>,

    /// Renderer hint for nodes
    #[serde(default)]
    pub view: RenderMode,

    /// Handling of malformed samples
    #[serde(default)]
    pub sample_policy: SamplePolicy,

    /// Upper bound on a single Prometheus query
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,

    /// Comma-separated histogram bucket bounds, lowest first
    #[serde(default)]
    pub buckets: Option<String>,
}

fn default_prometheus_host() -> String {
    "localhost".to_string()
}

fn default_prometheus_port() -> u16 {
    9090
}

fn default_api_port() -> u16 {
    8080
}

fn default_query_timeout() -> u64 {
    10
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            prometheus_host: default_prometheus_host(),
            prometheus_port: default_prometheus_port(),
            api_port: default_api_port(),
            metric_shape: MetricShape::default(),
            metric_name: None,
            view: RenderMode::default(),
            sample_policy: SamplePolicy::default(),
            query_timeout_secs: default_query_timeout(),
            buckets: None,
        }
    }
}

impl VizConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(config::Environment::with_prefix("VIZ"))
    }

    /// Load configuration from an explicit environment source
    pub fn from_env(env: config::Environment) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(env)
            .build()
            .context("Failed to read VIZ_* environment")?;

        let parsed: VizConfig = config
            .try_deserialize()
            .context("Invalid VIZ_* configuration")?;
        parsed.validate()?;

        Ok(parsed)
    }

    fn validate(&self) -> Result<()> {
        if self.query_timeout_secs == 0 {
            bail!("VIZ_QUERY_TIMEOUT_SECS must be greater than zero");
        }
        if self.bucket_sequence().is_empty() {
            bail!("VIZ_BUCKETS must list at least one bucket bound");
        }
        Ok(())
    }

    pub fn metric_name(&self) -> &str {
        self.metric_shape.metric_name(self.metric_name.as_deref())
    }

    /// PromQL expression sent on every graph request
    pub fn query(&self) -> String {
        instant_query(self.metric_name())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn bucket_sequence(&self) -> BucketSequence {
        match &self.buckets {
            Some(list) => BucketSequence::from_list(list),
            None => BucketSequence::default(),
        }
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            view: self.view,
            policy: self.sample_policy,
            buckets: self.bucket_sequence(),
        }
    }
}
