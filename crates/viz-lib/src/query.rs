//! Prometheus instant-query client and result types
//!
//! The graph service issues exactly one instant query per request. The query
//! subtracts the value observed one minute earlier so that series which are
//! not increasing are dropped by Prometheus itself:
//!
//! ```text
//! (<metric> - (<metric> offset 1m)) >= 0 or <metric>
//! ```

use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Histogram bucket series exported by the traffic capture agent
pub const DURATION_BUCKET_METRIC: &str = "request_duration_seconds_bucket";

/// Plain request counter exported by the traffic capture agent
pub const REQUEST_COUNT_METRIC: &str = "requests_total";

/// Shape of the metric requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricShape {
    /// Cumulative latency histogram (`le` labelled buckets)
    #[default]
    Histogram,
    /// Monotonic request counter
    Counter,
}

impl MetricShape {
    pub fn default_metric_name(&self) -> &'static str {
        match self {
            MetricShape::Histogram => DURATION_BUCKET_METRIC,
            MetricShape::Counter => REQUEST_COUNT_METRIC,
        }
    }

    /// `name` unless it is blank, else the default for this shape
    pub fn metric_name<'a>(&self, name: Option<&'a str>) -> &'a str {
        name.map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.default_metric_name())
    }
}

impl fmt::Display for MetricShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricShape::Histogram => f.write_str("histogram"),
            MetricShape::Counter => f.write_str("counter"),
        }
    }
}

impl FromStr for MetricShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "histogram" => Ok(MetricShape::Histogram),
            "counter" => Ok(MetricShape::Counter),
            other => Err(format!(
                "unknown metric shape '{}', expected 'histogram' or 'counter'",
                other
            )),
        }
    }
}

/// Build the instant query expression for a metric name
pub fn instant_query(metric: &str) -> String {
    format!(
        "({metric} - ({metric} offset 1m)) >= 0 or {metric}",
        metric = metric
    )
}

/// Top-level body of `/api/v1/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<QueryData>,
}

impl QueryResponse {
    /// Result vector, or `None` when the body lacks `data.result`
    pub fn samples(&self) -> Option<&[RawSample]> {
        self.data.as_ref()?.result.as_deref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryData {
    #[serde(rename = "resultType", default, skip_serializing_if = "Option::is_none")]
    pub result_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Vec<RawSample>>,
}

/// One element of an instant vector: label set plus `[timestamp, "value"]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSample {
    #[serde(default)]
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub value: Vec<serde_json::Value>,
}

/// A source of instant-query snapshots
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Run the configured query once
    async fn fetch(&self) -> Result<QueryResponse, FetchError>;
}

/// HTTP client for the Prometheus query API
#[derive(Debug, Clone)]
pub struct PrometheusClient {
    client: Client,
    endpoint: Url,
    query: String,
}

impl PrometheusClient {
    /// Create a client for `base_url` (e.g. `http://prometheus:9090`)
    pub fn new(
        base_url: &str,
        query: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let endpoint = Url::parse(&base)
            .and_then(|url| url.join("api/v1/query"))
            .map_err(|e| FetchError::Endpoint(format!("{}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            query: query.into(),
        })
    }

    /// Create a client from a host/port pair
    pub fn from_host_port(
        host: &str,
        port: u16,
        query: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        Self::new(&format!("http://{}:{}", host, port), query, timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    async fn fetch(&self) -> Result<QueryResponse, FetchError> {
        debug!(endpoint = %self.endpoint, query = %self.query, "Querying Prometheus");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("query", self.query.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Http(format!(
                "query API returned status {}: {}",
                status, body
            )));
        }

        response
            .json::<QueryResponse>()
            .await
            .map_err(|e| FetchError::Parse(e.to_string()))
    }
}
