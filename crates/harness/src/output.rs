//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use harness_lib::FeatureRow;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// One feature row, trimmed to what fits on a terminal
#[derive(Tabled, Serialize)]
pub struct FeaturePreview {
    #[tabled(rename = "Run")]
    pub run: u32,
    #[tabled(rename = "Elapsed (s)")]
    pub elapsed: String,
    #[tabled(rename = "Node 0 Usage")]
    pub node_0_usage: String,
    #[tabled(rename = "Node 1 Usage")]
    pub node_1_usage: String,
    #[tabled(rename = "Node 0 Trend")]
    pub node_0_trend: String,
    #[tabled(rename = "Migrations")]
    pub migrations: i64,
    #[tabled(rename = "Policy")]
    pub policy: String,
}

impl From<&FeatureRow> for FeaturePreview {
    fn from(row: &FeatureRow) -> Self {
        Self {
            run: row.run_id,
            elapsed: format!("{:.3}", row.run_timestep),
            node_0_usage: format_ratio(row.usage[0]),
            node_1_usage: format_ratio(row.usage[1]),
            node_0_trend: color_trend(row.trend[0]),
            migrations: row.total_page_migrations,
            policy: policy_label(row),
        }
    }
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => print_json(&items),
    }
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format a usage ratio as a percentage, or "-" when undefined
pub fn format_ratio(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}%", v * 100.0),
        None => "-".to_string(),
    }
}

/// Color a usage trend: growth red, shrinkage green
pub fn color_trend(value: Option<f64>) -> String {
    match value {
        Some(v) if v > 0.0 => format!("{:+.3}", v).red().to_string(),
        Some(v) if v < 0.0 => format!("{:+.3}", v).green().to_string(),
        Some(v) => format!("{:.3}", v),
        None => "-".to_string(),
    }
}

/// Name of the policy flag set on a feature row
pub fn policy_label(row: &FeatureRow) -> String {
    let flags = [
        (row.first_touch, "first-touch"),
        (row.interleave, "interleave"),
        (row.preferred_0, "preferred_0"),
        (row.preferred_1, "preferred_1"),
    ];
    flags
        .iter()
        .find(|(flag, _)| *flag == 1)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| "unknown".yellow().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ratio() {
        assert_eq!(format_ratio(Some(0.5)), "50.0%");
        assert_eq!(format_ratio(None), "-");
    }

    #[test]
    fn test_flat_trend_is_uncolored() {
        assert_eq!(color_trend(Some(0.0)), "0.000");
        assert_eq!(color_trend(None), "-");
    }
}
