//! Linker list file loader.
//!
//! Reads a `fromelf`-style disassembly listing:
//!
//! ```text
//!     LOG_ILogWaypointValue
//!         0x2000afc0:    b510        ..      PUSH     {r4,lr}
//!         0x2000afc2:    4c06        .L      LDR      r4,[pc,#24] ; [0x2000afdc] = 0x40240a5c
//!     $d
//!         0x2000afdc:    40240a5c    \.$@    DCD    1076104796
//! ```
//!
//! A line holding a single identifier labels a function and the next address
//! line gives its entry. The function's range runs to the end of the last
//! address line listed before the next label.

use super::prototypes::PrototypeIndex;
use super::symbol_table::{AddressRange, Symbol, SymbolTable};
use crate::parser::parse_hex;
use crate::utils::error::{LoadError, SymbolTableError};
use log::{debug, info};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A function as found in the listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFunction {
    pub name: String,
    pub entry: u64,
    pub end: u64,
}

/// Parsed list file
#[derive(Debug, Default)]
pub struct Listing {
    pub functions: Vec<ListedFunction>,
    /// Address -> `MNEMONIC operands`
    pub disassembly: HashMap<u64, String>,
}

impl Listing {
    /// Combine with prototypes into a validated symbol table
    ///
    /// **Public** - the hand-off from the loaders to the annotation engine
    pub fn resolve(self, prototypes: Option<&PrototypeIndex>) -> Result<SymbolTable, SymbolTableError> {
        let symbols = self
            .functions
            .into_iter()
            .map(|function| {
                let symbol = Symbol::new(
                    function.name,
                    function.entry,
                    AddressRange::new(function.entry, function.end),
                );
                match prototypes.and_then(|index| index.get(&symbol.name)) {
                    Some(found) => {
                        let (file, text) = (found.file.clone(), found.text.clone());
                        symbol.with_source(file, text)
                    }
                    None => symbol,
                }
            })
            .collect();

        Ok(SymbolTable::new(symbols)?.with_disassembly(self.disassembly))
    }
}

/// Load and parse a list file
///
/// **Public** - main entry point for symbol loading
///
/// # Errors
/// * `LoadError::IoError` - File cannot be read
pub fn load_list_file(path: impl AsRef<Path>) -> Result<Listing, LoadError> {
    let path = path.as_ref();
    info!("Loading list file: {}", path.display());

    let bytes = fs::read(path)?;
    let listing = parse_listing(&String::from_utf8_lossy(&bytes));

    info!(
        "List file loaded: {} functions, {} disassembly lines",
        listing.functions.len(),
        listing.disassembly.len()
    );

    Ok(listing)
}

/// Parse listing text
///
/// **Public** - used by `load_list_file` and tests
pub fn parse_listing(contents: &str) -> Listing {
    let mut listing = Listing::default();
    let mut pending_label: Option<String> = None;
    let mut current: Option<ListedFunction> = None;

    for line in contents.lines() {
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();

        // Section headers start a new region; nothing below belongs to the last function
        if tokens.first() == Some(&"**") {
            close_function(&mut listing, current.take());
            pending_label = None;
            continue;
        }

        let address_line = tokens.first().and_then(|t| parse_address_token(t)).map(|address| {
            let size = tokens
                .get(1)
                .and_then(|enc| parse_hex("encoding", enc).ok())
                .map(|enc| enc.byte_len())
                .unwrap_or(0);
            (address, size)
        });

        if let Some((address, size)) = address_line {
            if tokens.len() > 4 {
                listing
                    .disassembly
                    .insert(address, format!("{:<9}{}", tokens[3], tokens[4]));
            }

            if let Some(name) = pending_label.take() {
                close_function(&mut listing, current.take());
                current = Some(ListedFunction {
                    name,
                    entry: address,
                    end: address,
                });
            } else if current.as_ref().is_some_and(|f| address < f.end) {
                // Address went backwards: a different region, not this function
                close_function(&mut listing, current.take());
            }

            if let Some(function) = current.as_mut() {
                function.end = function.end.max(address.saturating_add(size.max(1)));
            }
            continue;
        }

        match tokens.as_slice() {
            [token] if is_function_label(token) => {
                if let Some(previous) = pending_label.replace(token.to_string()) {
                    debug!("Label {} aliased by {}", previous, token);
                }
            }
            _ => {
                // Anything else between a label and its first address cancels the label
                pending_label = None;
            }
        }
    }

    close_function(&mut listing, current);
    listing
}

fn close_function(listing: &mut Listing, function: Option<ListedFunction>) {
    if let Some(function) = function {
        listing.functions.push(function);
    }
}

/// `0x2000afc0:` -> `0x2000afc0`
fn parse_address_token(token: &str) -> Option<u64> {
    let hex = token.strip_suffix(':')?;
    if !hex.starts_with("0x") {
        return None;
    }
    parse_hex("address", hex).ok().map(|word| word.value)
}

/// Identifier label: optional leading underscores, a letter, then word characters
fn is_function_label(token: &str) -> bool {
    let body = token.trim_start_matches('_');
    let mut chars = body.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && body.len() >= 2
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
