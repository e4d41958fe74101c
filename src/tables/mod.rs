//! Read-only lookup tables consumed by the annotation engine.
//!
//! This module handles:
//! - The resolved symbol table (address ranges -> functions)
//! - Loading it from a linker list file plus C prototypes
//! - The watched-variable/register dictionary

pub mod list_file;
pub mod prototypes;
pub mod symbol_table;
pub mod watch_list;

// Re-export main types
pub use list_file::{load_list_file, parse_listing, ListedFunction, Listing};
pub use prototypes::{scan_source_tree, Prototype, PrototypeIndex, ScanOptions};
pub use symbol_table::{AddressRange, Symbol, SymbolTable};
pub use watch_list::{load_watch_list, parse_watch_list, WatchList, WatchListFile};
