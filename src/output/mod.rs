mod json;
mod table;

pub use json::print_json;
pub use table::print_table;

use crate::overview::Overview;
use anyhow::Result;

/// Output format for the package overview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    Table,
    /// JSON format for programmatic use
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

pub fn print_overview(overview: &Overview, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print_table(overview),
        OutputFormat::Json => print_json(overview),
    }
}
