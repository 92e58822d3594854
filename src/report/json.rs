//! JSON report export

use super::Report;
use crate::error::Result;
use std::path::Path;
use tracing::info;

/// Renders the report as pretty-printed JSON
pub fn to_string(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Exports the report as a JSON file
pub fn export(report: &Report, output_path: &Path) -> Result<()> {
    std::fs::write(output_path, to_string(report)?)?;
    info!("JSON report saved to {}", output_path.display());
    Ok(())
}
