//! Trace parsing and event definitions.
//!
//! This module handles:
//! - Reading raw lines byte-for-byte
//! - Parsing Tarmac lines into typed events
//! - Defining the event data model

pub mod lines;
pub mod schema;
pub mod tarmac;

// Re-export main types
pub use lines::{LineReader, RawLine};
pub use schema::{
    AccessSpace, EventKind, FetchState, HexWord, InstructionFetch, MemoryAccess, RegisterWrite,
    TraceEvent,
};
pub use tarmac::{parse_hex, parse_line};
