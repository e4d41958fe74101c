//! Symbols command implementation.
//!
//! Loads a list file (and optionally prototypes) and prints the resolved
//! symbol table, which is the quickest way to check a list file before
//! annotating a long trace.

use crate::tables::{load_list_file, scan_source_tree, ScanOptions, SymbolTable};
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;

/// Arguments for the symbols command
#[derive(Debug, Clone, Default)]
pub struct SymbolsArgs {
    pub list_file: PathBuf,
    pub source_path: Option<PathBuf>,
    pub exclude: Vec<String>,
}

/// Execute the symbols command
///
/// **Public** - main entry point called from main.rs
pub fn execute_symbols(args: SymbolsArgs) -> Result<()> {
    let listing = load_list_file(&args.list_file)
        .with_context(|| format!("Failed to load list file {}", args.list_file.display()))?;

    let prototypes = match &args.source_path {
        Some(root) => {
            let options = ScanOptions::default().with_exclude(args.exclude.clone());
            Some(
                scan_source_tree(root, &options)
                    .with_context(|| format!("Failed to scan source tree {}", root.display()))?,
            )
        }
        None => None,
    };

    let symbols = listing
        .resolve(prototypes.as_ref())
        .context("List file produced a conflicting symbol table")?;

    info!("Resolved {} functions", symbols.len());
    print!("{}", render_symbol_table(&symbols));

    Ok(())
}

/// One line per symbol: range, size, name and prototype when known
///
/// **Public** - used by execute_symbols and tests
pub fn render_symbol_table(symbols: &SymbolTable) -> String {
    let mut out = String::new();

    for symbol in symbols.iter() {
        out.push_str(&format!(
            "{} {:>6} {}",
            symbol.range,
            symbol.range.len(),
            symbol.name
        ));
        if let Some(prototype) = &symbol.prototype {
            out.push_str(&format!("  [{}]", prototype));
        }
        out.push('\n');
    }

    out
}
