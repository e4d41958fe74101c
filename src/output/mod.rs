//! Output writers for annotated traces and run reports.
//!
//! This module handles writing data to disk:
//! - The annotated trace (original lines plus banners and inline comments)
//! - The optional stack pointer side file
//! - JSON run reports
//! - Terminal summaries

pub mod json;
pub mod terminal;
pub mod writer;

// Re-export main functions
pub use json::{read_report, report_to_string, write_report};
pub use terminal::render_terminal_summary;
pub use writer::{is_stack_pointer_write, AnnotatedWriter, StackFileWriter};

use crate::utils::error::OutputError;
use log::debug;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Open an output file, creating missing parent directories
///
/// **Public** - shared by every file the tool writes
///
/// # Errors
/// * `OutputError::InvalidPath` - Path is empty, a directory, or its parent cannot be created
/// * `OutputError::WriteFailed` - File cannot be created
pub fn create_output_file(path: impl AsRef<Path>) -> Result<BufWriter<File>, OutputError> {
    let path = path.as_ref();
    validate_output_path(path)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(path).map_err(OutputError::WriteFailed)?;
    Ok(BufWriter::new(file))
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    // Check if we're trying to overwrite a directory
    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}
