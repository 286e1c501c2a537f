//! Edge aggregation and health classification
//!
//! Samples are grouped by `(source, destination)` and each group becomes one
//! directed connection. Two strategies exist, selected by whether the input
//! carries histogram bucket bounds:
//! - [`CounterAggregator`] classifies every sample by status code
//! - [`HistogramAggregator`] classifies only the terminal `+Inf` bucket and
//!   annotates the edge with ports, per-status totals and latency deltas

use super::histogram::BucketSequence;
use super::sample::MetricSample;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Vizceral class applied to every edge
pub const CONNECTION_CLASS: &str = "normal";

/// Node type reported in edge metadata
pub const NODE_TYPE: &str = "deployment";

/// `(source, target)` identifiers of a directed edge
pub type EdgeKey = (String, String);

/// Health bucket for an HTTP status code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthClass {
    /// 2xx and 3xx
    Normal,
    /// 4xx
    Danger,
    /// Anything else, including 5xx and codes below 200
    Warning,
}

impl HealthClass {
    pub fn from_status(code: u16) -> Self {
        match code {
            200..=399 => HealthClass::Normal,
            400..=499 => HealthClass::Danger,
            _ => HealthClass::Warning,
        }
    }
}

/// Request volume per health bucket
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficMetrics {
    pub normal: u64,
    pub danger: u64,
    pub warning: u64,
}

impl TrafficMetrics {
    pub fn record(&mut self, code: u16, count: u64) {
        match HealthClass::from_status(code) {
            HealthClass::Normal => self.normal = self.normal.saturating_add(count),
            HealthClass::Danger => self.danger = self.danger.saturating_add(count),
            HealthClass::Warning => self.warning = self.warning.saturating_add(count),
        }
    }

    /// Saturates at `u64::MAX`
    pub fn total(&self) -> u64 {
        self.normal
            .saturating_add(self.danger)
            .saturating_add(self.warning)
    }
}

/// Annotation value shown by the frontend on hover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Annotation {
    Count(u64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionMetadata {
    #[serde(rename = "nodeType")]
    pub node_type: String,
}

/// One directed edge of the traffic graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: String,
    pub target: String,
    pub metrics: TrafficMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<BTreeMap<String, Annotation>>,
    pub class: String,
    pub metadata: ConnectionMetadata,
}

impl Connection {
    fn new(source: &str, target: &str, metrics: TrafficMetrics) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            metrics,
            annotations: None,
            class: CONNECTION_CLASS.to_string(),
            metadata: ConnectionMetadata {
                node_type: NODE_TYPE.to_string(),
            },
        }
    }
}

/// Group samples by `(source, destination)`
pub fn group_by_edge(samples: &[MetricSample]) -> BTreeMap<EdgeKey, Vec<&MetricSample>> {
    let mut groups: BTreeMap<EdgeKey, Vec<&MetricSample>> = BTreeMap::new();
    for sample in samples {
        groups
            .entry((sample.source.clone(), sample.destination.clone()))
            .or_default()
            .push(sample);
    }
    groups
}

/// Sum of counts per response code
fn totals_by_status<'a>(samples: impl Iterator<Item = &'a MetricSample>) -> BTreeMap<u16, u64> {
    let mut totals = BTreeMap::new();
    for sample in samples {
        let total = totals.entry(sample.response_code).or_insert(0u64);
        *total = total.saturating_add(sample.count);
    }
    totals
}

/// Strategy turning one edge group into a connection
pub trait ConnectionAggregator: Send + Sync {
    fn aggregate(&self, source: &str, target: &str, samples: &[&MetricSample]) -> Connection;

    /// Scale hint for edge thickness, if this strategy reports one
    fn max_volume(&self, _connections: &[Connection]) -> Option<u64> {
        None
    }
}

/// Strategy for plain request counters
#[derive(Debug, Clone, Copy, Default)]
pub struct CounterAggregator;

impl ConnectionAggregator for CounterAggregator {
    fn aggregate(&self, source: &str, target: &str, samples: &[&MetricSample]) -> Connection {
        let mut metrics = TrafficMetrics::default();
        for (code, count) in totals_by_status(samples.iter().copied()) {
            metrics.record(code, count);
        }
        Connection::new(source, target, metrics)
    }
}

/// Strategy for cumulative latency histograms
#[derive(Debug, Clone, Default)]
pub struct HistogramAggregator {
    buckets: BucketSequence,
}

impl HistogramAggregator {
    pub fn new(buckets: BucketSequence) -> Self {
        Self { buckets }
    }
}

impl ConnectionAggregator for HistogramAggregator {
    fn aggregate(&self, source: &str, target: &str, samples: &[&MetricSample]) -> Connection {
        let terminal: Vec<&MetricSample> =
            samples.iter().copied().filter(|s| s.is_terminal()).collect();

        let ports: BTreeSet<&str> = terminal
            .iter()
            .map(|s| s.destination_port.as_str())
            .filter(|p| !p.is_empty())
            .collect();

        let mut annotations = BTreeMap::new();
        annotations.insert("source".to_string(), Annotation::Text(source.to_string()));
        annotations.insert(
            "destination".to_string(),
            Annotation::Text(target.to_string()),
        );
        annotations.insert(
            "ports".to_string(),
            Annotation::Text(ports.into_iter().collect::<Vec<_>>().join(",")),
        );

        let mut metrics = TrafficMetrics::default();
        for (code, count) in totals_by_status(terminal.iter().copied()) {
            metrics.record(code, count);
            annotations.insert(format!("HTTP {}", code), Annotation::Count(count));
        }

        let mut by_bound: BTreeMap<String, u64> = BTreeMap::new();
        for sample in samples {
            if let Some(bound) = &sample.bucket_bound {
                let total = by_bound.entry(bound.clone()).or_insert(0);
                *total = total.saturating_add(sample.count);
            }
        }
        for (label, delta) in self.buckets.differences(&by_bound) {
            annotations.insert(label, Annotation::Count(delta));
        }

        let mut connection = Connection::new(source, target, metrics);
        connection.annotations = Some(annotations);
        connection
    }

    fn max_volume(&self, connections: &[Connection]) -> Option<u64> {
        connections
            .iter()
            .map(|c| c.metrics.total())
            .max()
            .map(|busiest| busiest.saturating_mul(2).saturating_add(20))
    }
}

/// Pick the histogram strategy when any sample carries a bucket bound
pub fn select_aggregator(
    samples: &[MetricSample],
    buckets: &BucketSequence,
) -> Box<dyn ConnectionAggregator> {
    if samples.iter().any(|s| s.bucket_bound.is_some()) {
        Box::new(HistogramAggregator::new(buckets.clone()))
    } else {
        Box::new(CounterAggregator)
    }
}
