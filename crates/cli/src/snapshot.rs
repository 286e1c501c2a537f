//! Loading query snapshots from Prometheus or from disk

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;
use viz_lib::graph::{BucketSequence, GraphOptions, RenderMode, SamplePolicy};
use viz_lib::query::{instant_query, MetricShape, MetricsSource, PrometheusClient, QueryResponse};

/// Where to read a snapshot from and how to turn it into a graph
#[derive(Debug, Clone)]
pub struct SnapshotArgs {
    pub prometheus_url: String,
    pub shape: MetricShape,
    pub metric: Option<String>,
    pub view: RenderMode,
    pub lenient: bool,
    pub buckets: Option<String>,
    pub timeout: Duration,
}

impl SnapshotArgs {
    /// Reject flag values the graph service would also refuse
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            bail!("--timeout-secs must be greater than zero");
        }
        if self.graph_options().buckets.is_empty() {
            bail!("--buckets must list at least one bucket bound");
        }
        Ok(())
    }

    pub fn query(&self) -> String {
        instant_query(self.shape.metric_name(self.metric.as_deref()))
    }

    pub fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            view: self.view,
            policy: if self.lenient {
                SamplePolicy::Lenient
            } else {
                SamplePolicy::Strict
            },
            buckets: self
                .buckets
                .as_deref()
                .map(BucketSequence::from_list)
                .unwrap_or_default(),
        }
    }

    /// Read a saved query result, or run the query against Prometheus
    pub async fn load(&self, file: Option<&Path>) -> Result<QueryResponse> {
        match file {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                serde_json::from_str(&content)
                    .with_context(|| format!("{} is not a Prometheus query result", path.display()))
            }
            None => {
                let client = PrometheusClient::new(&self.prometheus_url, self.query(), self.timeout)
                    .context("Invalid Prometheus URL")?;
                client
                    .fetch()
                    .await
                    .with_context(|| format!("Failed to query {}", client.endpoint()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> SnapshotArgs {
        SnapshotArgs {
            prometheus_url: "http://localhost:9090".into(),
            shape: MetricShape::Counter,
            metric: None,
            view: RenderMode::Region,
            lenient: false,
            buckets: None,
            timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_query_uses_shape_default() {
        assert_eq!(
            args().query(),
            "(requests_total - (requests_total offset 1m)) >= 0 or requests_total"
        );
    }

    #[test]
    fn test_blank_metric_falls_back_to_default() {
        let mut args = args();
        args.metric = Some(String::new());
        assert_eq!(
            args.query(),
            "(requests_total - (requests_total offset 1m)) >= 0 or requests_total"
        );

        args.metric = Some("http_requests".into());
        assert!(args.query().ends_with("or http_requests"));
    }

    #[test]
    fn test_validate_rejects_bad_flags() {
        assert!(args().validate().is_ok());

        let mut blank_buckets = args();
        blank_buckets.buckets = Some(" , ".into());
        let err = blank_buckets.validate().unwrap_err();
        assert!(err.to_string().contains("--buckets"));

        let mut zero_timeout = args();
        zero_timeout.timeout = Duration::ZERO;
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_graph_options() {
        let mut args = args();
        args.lenient = true;
        args.buckets = Some("0,1,+Inf".into());

        let options = args.graph_options();
        assert_eq!(options.policy, SamplePolicy::Lenient);
        assert_eq!(options.buckets.bounds(), &["0", "1", "+Inf"]);
    }
}
