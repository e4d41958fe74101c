//! Tarmac Annotate
//!
//! Annotates Tarmac instruction traces from Arm simulators with function
//! call trees, C prototypes and watched variable accesses.
//!
//! This crate provides the core implementation for the
//! `tarmac-annotate` CLI tool.
//!
//! ## Getting Started
//!
//! Most users should install and use the CLI:
//!
//! ```bash
//! cargo install tarmac-annotate
//! tarmac-annotate annotate tarmac.log Project_Assembly.txt --path src/
//! ```
//!
//! The library can also be driven directly:
//!
//! ```ignore
//! let symbols = parse_listing(&listing_text).resolve(None)?;
//! let watch = WatchList::new().with_address(0x2001ec00, "LogCounter");
//! let mut annotator = Annotator::new(&symbols, &watch, AnnotatorConfig::default());
//! let summary = annotator.annotate(trace_reader, output_writer)?;
//! ```

pub mod commands;
pub mod engine;
pub mod output;
pub mod parser;
pub mod tables;
pub mod utils;

pub use engine::{AnnotationSummary, Annotator, CallStackTracker, RunReport};
pub use tables::{SymbolTable, WatchList};
pub use utils::config::AnnotatorConfig;
