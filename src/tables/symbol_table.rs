//! Resolved function symbols and address lookup.
//!
//! The table is built once before annotation and only read afterwards.
//! Ranges are half-open and must not overlap; a table that violates this is
//! rejected at construction.

use crate::utils::error::SymbolTableError;
use log::debug;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;

/// Half-open address interval `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    pub start: u64,
    pub end: u64,
}

impl AddressRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, address: u64) -> bool {
        self.start <= address && address < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}..{:08x}", self.start, self.end)
    }
}

/// One resolved function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub entry: u64,
    pub range: AddressRange,
    pub source_file: Option<PathBuf>,
    pub prototype: Option<String>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, entry: u64, range: AddressRange) -> Self {
        Self {
            name: name.into(),
            entry,
            range,
            source_file: None,
            prototype: None,
        }
    }

    pub fn with_source(mut self, file: impl Into<PathBuf>, prototype: impl Into<String>) -> Self {
        self.source_file = Some(file.into());
        self.prototype = Some(prototype.into());
        self
    }
}

/// Immutable address -> symbol table
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_entry: HashMap<u64, usize>,
    by_start: BTreeMap<u64, usize>,
    by_name: HashMap<String, usize>,
    disassembly: HashMap<u64, String>,
}

impl SymbolTable {
    /// Build and validate a table
    ///
    /// # Errors
    /// Any empty range, entry outside its range, duplicate entry, or overlap
    /// between two symbols.
    pub fn new(mut symbols: Vec<Symbol>) -> Result<Self, SymbolTableError> {
        symbols.sort_by_key(|s| (s.range.start, s.entry));

        let mut by_entry = HashMap::with_capacity(symbols.len());
        let mut by_start = BTreeMap::new();
        let mut by_name = HashMap::with_capacity(symbols.len());

        for (index, symbol) in symbols.iter().enumerate() {
            if symbol.range.is_empty() {
                return Err(SymbolTableError::EmptyRange {
                    name: symbol.name.clone(),
                    start: symbol.range.start,
                });
            }

            if !symbol.range.contains(symbol.entry) {
                return Err(SymbolTableError::EntryOutsideRange {
                    name: symbol.name.clone(),
                    entry: symbol.entry,
                    start: symbol.range.start,
                    end: symbol.range.end,
                });
            }

            if let Some(&other) = by_entry.get(&symbol.entry) {
                let other: &Symbol = &symbols[other];
                return Err(SymbolTableError::DuplicateEntry {
                    first: other.name.clone(),
                    second: symbol.name.clone(),
                    entry: symbol.entry,
                });
            }

            // Sorted by start, so only the predecessor can overlap
            if index > 0 {
                let previous = &symbols[index - 1];
                if previous.range.end > symbol.range.start {
                    return Err(SymbolTableError::OverlappingRanges {
                        first: previous.name.clone(),
                        second: symbol.name.clone(),
                        address: symbol.range.start,
                    });
                }
            }

            by_entry.insert(symbol.entry, index);
            by_start.insert(symbol.range.start, index);
            // Static functions may share a name; the lowest address keeps it
            by_name.entry(symbol.name.clone()).or_insert(index);
        }

        debug!("Symbol table built with {} symbols", symbols.len());

        Ok(Self {
            symbols,
            by_entry,
            by_start,
            by_name,
            disassembly: HashMap::new(),
        })
    }

    /// Attach per-address disassembly from the list file
    pub fn with_disassembly(mut self, disassembly: HashMap<u64, String>) -> Self {
        self.disassembly = disassembly;
        self
    }

    /// Symbol whose entry address is exactly `address`
    pub fn entry_at(&self, address: u64) -> Option<&Symbol> {
        self.by_entry.get(&address).map(|&i| &self.symbols[i])
    }

    /// Symbol whose range contains `address`
    pub fn containing(&self, address: u64) -> Option<&Symbol> {
        let (_, &index) = self.by_start.range(..=address).next_back()?;
        let symbol = &self.symbols[index];
        symbol.range.contains(address).then_some(symbol)
    }

    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).map(|&i| &self.symbols[i])
    }

    /// Listing disassembly for `address`, if the list file had it
    pub fn disassembly_at(&self, address: u64) -> Option<&str> {
        self.disassembly.get(&address).map(String::as_str)
    }

    /// All symbols in address order
    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(name: &str, start: u64, end: u64) -> Symbol {
        Symbol::new(name, start, AddressRange::new(start, end))
    }

    #[test]
    fn test_lookup_by_entry_and_range() {
        let table = SymbolTable::new(vec![sym("b", 0x200, 0x240), sym("a", 0x100, 0x180)]).unwrap();

        assert_eq!(table.entry_at(0x100).unwrap().name, "a");
        assert!(table.entry_at(0x102).is_none());
        assert_eq!(table.containing(0x17e).unwrap().name, "a");
        assert!(table.containing(0x180).is_none());
        assert!(table.containing(0x0ff).is_none());
        assert_eq!(table.containing(0x200).unwrap().name, "b");
        assert_eq!(table.by_name("b").unwrap().entry, 0x200);
        assert_eq!(table.iter().next().unwrap().name, "a");
    }

    #[test]
    fn test_overlap_is_rejected() {
        let err = SymbolTable::new(vec![sym("a", 0x100, 0x180), sym("b", 0x170, 0x200)]).unwrap_err();
        assert_eq!(
            err,
            SymbolTableError::OverlappingRanges {
                first: "a".to_string(),
                second: "b".to_string(),
                address: 0x170
            }
        );
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let mut b = sym("b", 0x100, 0x104);
        b.range = AddressRange::new(0x0f0, 0x104);
        let err = SymbolTable::new(vec![sym("a", 0x100, 0x180), b]).unwrap_err();
        assert!(matches!(err, SymbolTableError::DuplicateEntry { .. }));
    }

    #[test]
    fn test_entry_outside_range_is_rejected() {
        let symbol = Symbol::new("a", 0x300, AddressRange::new(0x100, 0x180));
        assert!(matches!(
            SymbolTable::new(vec![symbol]),
            Err(SymbolTableError::EntryOutsideRange { .. })
        ));
    }

    #[test]
    fn test_empty_range_is_rejected() {
        assert!(matches!(
            SymbolTable::new(vec![sym("a", 0x100, 0x100)]),
            Err(SymbolTableError::EmptyRange { .. })
        ));
    }
}
