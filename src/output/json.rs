//! JSON run report writer.
//!
//! Writes `RunReport` structs to JSON files with proper formatting.

use super::create_output_file;
use crate::engine::summary::RunReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Write a run report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `report` - Report to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_report(report: &RunReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing run report to: {}", output_path.display());

    let mut writer = create_output_file(output_path)?;
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush()?;

    info!(
        "Run report written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize a report to a string
///
/// **Public** - useful for tests and debugging
pub fn report_to_string(report: &RunReport) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Read a run report from a JSON file
///
/// **Public** - useful for tooling and testing
///
/// # Errors
/// * `OutputError::ReadFailed` - File cannot be opened
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<RunReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading run report from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::ReadFailed)?;
    let report: RunReport = serde_json::from_reader(file)?;

    debug!(
        "Run report loaded: version {}, trace {}",
        report.version, report.trace_file
    );

    Ok(report)
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
