//! Per-connection traffic command

use anyhow::Result;
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;
use viz_lib::graph::{build_graph, Annotation, Connection};

use crate::output::{color_error_rate, error_rate, print_table, OutputFormat};
use crate::snapshot::SnapshotArgs;

/// Row for connections table
#[derive(Tabled, Serialize)]
struct EdgeRow {
    #[tabled(rename = "Source")]
    source: String,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Normal")]
    normal: u64,
    #[tabled(rename = "Danger")]
    danger: u64,
    #[tabled(rename = "Warning")]
    warning: u64,
    #[tabled(rename = "Errors")]
    #[serde(skip)]
    error_rate: String,
    #[tabled(rename = "Ports")]
    ports: String,
}

impl From<&Connection> for EdgeRow {
    fn from(connection: &Connection) -> Self {
        let ports = connection
            .annotations
            .as_ref()
            .and_then(|a| a.get("ports"))
            .map(|ports| match ports {
                Annotation::Text(text) => text.clone(),
                Annotation::Count(n) => n.to_string(),
            })
            .unwrap_or_default();

        Self {
            source: connection.source.clone(),
            target: connection.target.clone(),
            normal: connection.metrics.normal,
            danger: connection.metrics.danger,
            warning: connection.metrics.warning,
            error_rate: color_error_rate(error_rate(&connection.metrics)),
            ports,
        }
    }
}

/// List connections, optionally only those touching `node`
pub async fn list_edges(
    args: &SnapshotArgs,
    file: Option<&Path>,
    node: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let response = args.load(file).await?;
    let graph = build_graph(&response, &args.graph_options())?.graph;

    let rows: Vec<EdgeRow> = graph
        .connections
        .iter()
        .filter(|c| node.map(|n| c.source == n || c.target == n).unwrap_or(true))
        .map(EdgeRow::from)
        .collect();

    print_table(&rows, format);
    Ok(())
}
