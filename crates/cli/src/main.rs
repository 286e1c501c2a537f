//! Traffic Monitor CLI
//!
//! Builds the Vizceral traffic graph from a live Prometheus query or a saved
//! query result, for inspecting what the graph service would serve.

mod commands;
mod output;
mod snapshot;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use viz_lib::graph::RenderMode;
use viz_lib::query::MetricShape;

/// Traffic Monitor CLI
#[derive(Parser)]
#[command(name = "tmctl")]
#[command(author, version, about = "CLI for the Traffic Monitor graph service", long_about = None)]
pub struct Cli {
    /// Prometheus base URL (can also be set via VIZ_PROMETHEUS_URL env var)
    #[arg(long, env = "VIZ_PROMETHEUS_URL", default_value = "http://localhost:9090")]
    pub prometheus_url: String,

    /// Metric shape to query (histogram or counter)
    #[arg(long, env = "VIZ_METRIC_SHAPE", default_value = "histogram")]
    pub shape: MetricShape,

    /// Metric name override
    #[arg(long, env = "VIZ_METRIC_NAME")]
    pub metric: Option<String>,

    /// Node renderer hint (region or focusedChild)
    #[arg(long, default_value = "region")]
    pub view: RenderMode,

    /// Skip malformed samples instead of failing
    #[arg(long)]
    pub lenient: bool,

    /// Comma-separated histogram bucket bounds, lowest first
    #[arg(long, env = "VIZ_BUCKETS")]
    pub buckets: Option<String>,

    /// Query timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and print the graph document
    Graph {
        /// Read a saved Prometheus query result instead of querying
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// List connections with their traffic breakdown
    Edges {
        /// Read a saved Prometheus query result instead of querying
        #[arg(long)]
        file: Option<PathBuf>,

        /// Only show connections to or from this node
        #[arg(long, short)]
        node: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = snapshot::SnapshotArgs {
        prometheus_url: cli.prometheus_url,
        shape: cli.shape,
        metric: cli.metric,
        view: cli.view,
        lenient: cli.lenient,
        buckets: cli.buckets,
        timeout: Duration::from_secs(cli.timeout_secs),
    };
    args.validate()?;

    match cli.command {
        Commands::Graph { file } => {
            commands::graph::show_graph(&args, file.as_deref(), cli.format).await?;
        }
        Commands::Edges { file, node } => {
            commands::edges::list_edges(&args, file.as_deref(), node.as_deref(), cli.format)
                .await?;
        }
    }

    Ok(())
}
