//! Graph document command

use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use viz_lib::graph::{build_graph, TrafficGraph};

use crate::output::{format_timestamp, print_info, print_warning, OutputFormat};
use crate::snapshot::SnapshotArgs;

/// Build the graph document and print it
pub async fn show_graph(
    args: &SnapshotArgs,
    file: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let response = args.load(file).await?;
    let build = build_graph(&response, &args.graph_options())?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&build.graph)?);
        }
        OutputFormat::Table => {
            print_summary(&build.graph);
            for skipped in &build.skipped {
                print_warning(&format!(
                    "Skipped sample {}: {}",
                    skipped.index, skipped.error
                ));
            }
        }
    }

    Ok(())
}

fn print_summary(graph: &TrafficGraph) {
    println!("{}", "Traffic Graph".bold());
    println!("{}", "=".repeat(50));
    println!("Updated:                {}", format_timestamp(graph.server_update_time));
    println!("Nodes:                  {}", graph.nodes.len());
    println!("Connections:            {}", graph.connections.len());
    if let Some(max_volume) = graph.max_volume {
        println!("Max volume:             {}", max_volume);
    }

    if graph.nodes.is_empty() {
        println!();
        print_info("The query returned no traffic");
        return;
    }

    println!();
    println!("{}", "Nodes".bold());
    println!("{}", "-".repeat(50));
    for node in &graph.nodes {
        println!("  {}", node.name.cyan());
    }
}
