mod cli;
mod json;

pub use cli::print_cli_table;
pub use json::print_json;

use crate::config::Config;
use crate::model::{ScanReport, Summary};
use anyhow::Result;

/// Output format for scan results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables plus a summary block
    Table,
    /// JSON summary for programmatic use
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use 'table' or 'json'", s)),
        }
    }
}

pub fn print_result(report: &ScanReport, config: &Config, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_cli_table(report, config),
        OutputFormat::Json => print_json(report, config),
    }
}

/// Format result to string for file output. Files always get the JSON summary.
pub fn format_result_to_string(report: &ScanReport, config: &Config) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Summary::new(report, config))?)
}
