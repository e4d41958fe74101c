//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod annotate;
pub mod models;
pub mod symbols;
pub mod utils;

// Re-export main command functions
pub use annotate::{execute_annotate, resolve_paths, validate_args};
pub use models::{AnnotateArgs, AnnotatePaths};
pub use symbols::{execute_symbols, SymbolsArgs};
pub use utils::display_version;
