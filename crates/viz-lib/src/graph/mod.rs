//! Traffic graph assembly
//!
//! Turns one Prometheus instant-query snapshot into the node/edge document
//! rendered by the Vizceral frontend. The pipeline is stateless:
//! raw samples are normalized, the node set is derived, samples are grouped
//! into directed edges and classified, and the result is assembled with a
//! fresh `serverUpdateTime`.

mod connections;
mod histogram;
mod nodes;
mod sample;

#[cfg(test)]
mod tests;

pub use connections::{
    group_by_edge, select_aggregator, Annotation, Connection, ConnectionAggregator,
    ConnectionMetadata, CounterAggregator, EdgeKey, HealthClass, HistogramAggregator,
    TrafficMetrics,
};
pub use histogram::{BucketSequence, DEFAULT_BUCKETS};
pub use nodes::derive_nodes;
pub use sample::{normalize, MetricSample, TERMINAL_BUCKET, UNKNOWN_SOURCE};

use crate::error::{GraphError, GraphResult, SampleError};
use crate::query::{QueryResponse, RawSample};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Renderer of the graph document itself
pub const GRAPH_RENDERER: &str = "region";

/// Name of the graph document
pub const GRAPH_NAME: &str = "graph";

/// Vizceral class applied to every node
pub const NODE_CLASS: &str = "normal";

/// Vizceral renderer hint for nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// Top-level region view
    #[default]
    Region,
    /// Drill-down view of a single node
    FocusedChild,
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Region => f.write_str("region"),
            RenderMode::FocusedChild => f.write_str("focusedChild"),
        }
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['_', '-'], "").as_str() {
            "region" => Ok(RenderMode::Region),
            "focusedchild" => Ok(RenderMode::FocusedChild),
            _ => Err(format!(
                "unknown view '{}', expected 'region' or 'focusedChild'",
                s
            )),
        }
    }
}

/// What to do with a sample that fails normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplePolicy {
    /// Fail the whole graph
    #[default]
    Strict,
    /// Skip the sample and keep going
    Lenient,
}

impl FromStr for SamplePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SamplePolicy::Strict),
            "lenient" => Ok(SamplePolicy::Lenient),
            _ => Err(format!(
                "unknown sample policy '{}', expected 'strict' or 'lenient'",
                s
            )),
        }
    }
}

/// Options controlling how a snapshot is turned into a graph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GraphOptions {
    pub view: RenderMode,
    pub policy: SamplePolicy,
    pub buckets: BucketSequence,
}

/// A participant in the traffic graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub name: String,
    pub display_name: String,
    pub class: String,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub renderer: RenderMode,
}

impl Node {
    pub fn new(name: impl Into<String>, renderer: RenderMode) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            class: NODE_CLASS.to_string(),
            metadata: BTreeMap::new(),
            renderer,
        }
    }
}

/// The document served to the frontend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficGraph {
    pub renderer: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_volume: Option<u64>,
    pub server_update_time: i64,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
}

impl TrafficGraph {
    pub fn empty(server_update_time: i64) -> Self {
        Self {
            renderer: GRAPH_RENDERER.to_string(),
            name: GRAPH_NAME.to_string(),
            max_volume: None,
            server_update_time,
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }
}

/// A built graph plus the number of samples dropped under the lenient policy
#[derive(Debug, Clone, PartialEq)]
pub struct GraphBuild {
    pub graph: TrafficGraph,
    /// Samples dropped under the lenient policy, in input order
    pub skipped: Vec<SkippedSample>,
}

impl GraphBuild {
    pub fn skipped_samples(&self) -> usize {
        self.skipped.len()
    }
}

/// A raw sample left out of the graph and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSample {
    pub index: usize,
    pub error: SampleError,
}

/// Normalize raw samples according to `policy`
///
/// Returns the normalized samples and the ones that were skipped.
pub fn normalize_samples(
    raw: &[RawSample],
    policy: SamplePolicy,
) -> GraphResult<(Vec<MetricSample>, Vec<SkippedSample>)> {
    let mut samples = Vec::with_capacity(raw.len());
    let mut skipped = Vec::new();

    for (index, item) in raw.iter().enumerate() {
        match MetricSample::try_from(item) {
            Ok(sample) => samples.push(sample),
            Err(source) => match policy {
                SamplePolicy::Strict => return Err(GraphError::Sample { index, source }),
                SamplePolicy::Lenient => skipped.push(SkippedSample {
                    index,
                    error: source,
                }),
            },
        }
    }

    Ok((samples, skipped))
}

/// Assemble a graph from normalized samples
pub fn assemble(
    samples: &[MetricSample],
    options: &GraphOptions,
    server_update_time: i64,
) -> TrafficGraph {
    let nodes = derive_nodes(samples)
        .into_iter()
        .map(|name| Node::new(name, options.view))
        .collect();

    let aggregator = select_aggregator(samples, &options.buckets);
    let connections: Vec<Connection> = group_by_edge(samples)
        .into_iter()
        .map(|((source, target), group)| aggregator.aggregate(&source, &target, &group))
        .collect();

    TrafficGraph {
        max_volume: aggregator.max_volume(&connections),
        nodes,
        connections,
        ..TrafficGraph::empty(server_update_time)
    }
}

/// Build a graph from a query response, stamped with the current time
pub fn build_graph(response: &QueryResponse, options: &GraphOptions) -> GraphResult<GraphBuild> {
    build_graph_at(response, options, chrono::Utc::now().timestamp_millis())
}

/// Build a graph from a query response with an explicit timestamp
pub fn build_graph_at(
    response: &QueryResponse,
    options: &GraphOptions,
    server_update_time: i64,
) -> GraphResult<GraphBuild> {
    let Some(raw) = response.samples() else {
        return Ok(GraphBuild {
            graph: TrafficGraph::empty(server_update_time),
            skipped: Vec::new(),
        });
    };

    let (samples, skipped) = normalize_samples(raw, options.policy)?;

    Ok(GraphBuild {
        graph: assemble(&samples, options, server_update_time),
        skipped,
    })
}
