//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use viz_lib::graph::TrafficMetrics;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No connections found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Share of error traffic on an edge, as a percentage
pub fn error_rate(metrics: &TrafficMetrics) -> f64 {
    let total = metrics.total();
    if total == 0 {
        0.0
    } else {
        (metrics.danger + metrics.warning) as f64 / total as f64 * 100.0
    }
}

/// Color an error rate: green below 1%, yellow below 5%, red otherwise
pub fn color_error_rate(rate: f64) -> String {
    let formatted = format!("{:.1}%", rate);
    if rate < 1.0 {
        formatted.green().to_string()
    } else if rate < 5.0 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

/// Format a server update timestamp (ms since epoch)
pub fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::<chrono::Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_rate() {
        let metrics = TrafficMetrics {
            normal: 90,
            danger: 6,
            warning: 4,
        };
        assert!((error_rate(&metrics) - 10.0).abs() < 1e-9);
        assert_eq!(error_rate(&TrafficMetrics::default()), 0.0);
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(1_700_000_000_123),
            "2023-11-14 22:13:20.123 UTC"
        );
    }
}
