//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors that can occur while parsing a single trace line
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unrecognized trace line: {0}")]
    UnrecognizedLine(String),

    #[error("Missing {field} field")]
    MissingField { field: &'static str },

    #[error("Malformed hex in {field} field: '{token}'")]
    MalformedHex { field: &'static str, token: String },

    #[error("Timestamp {found} is earlier than previous timestamp {previous}")]
    OutOfOrderTimestamp { previous: u64, found: u64 },

    #[error("Line is not valid UTF-8")]
    InvalidEncoding,
}

/// Conflicts in the resolved symbol table
///
/// Any of these makes call-stack tracking unreliable, so they are
/// reported before annotation starts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SymbolTableError {
    #[error("Symbol {name} has an empty address range at {start:08x}")]
    EmptyRange { name: String, start: u64 },

    #[error("Symbol {name} entry {entry:08x} lies outside its own range {start:08x}..{end:08x}")]
    EntryOutsideRange {
        name: String,
        entry: u64,
        start: u64,
        end: u64,
    },

    #[error("Symbols {first} and {second} share the entry address {entry:08x}")]
    DuplicateEntry {
        first: String,
        second: String,
        entry: u64,
    },

    #[error("Symbols {first} and {second} claim overlapping addresses starting at {address:08x}")]
    OverlappingRanges {
        first: String,
        second: String,
        address: u64,
    },
}

/// Errors that can occur while loading external inputs
/// (list file, source tree, watch list)
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to walk source tree: {0}")]
    WalkFailed(#[from] walkdir::Error),

    #[error("Watch list TOML parse error: {0}")]
    WatchListParseFailed(#[from] toml::de::Error),

    #[error("Invalid watch list entry '{key}': {reason}")]
    InvalidWatchEntry { key: String, reason: String },

    #[error("Symbol table conflict: {0}")]
    Conflict(#[from] SymbolTableError),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to read input: {0}")]
    ReadFailed(std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}

/// A call-stack state the tracker could not reconcile
///
/// Anomalies are recoverable: the tracker logs them, repairs its state and
/// keeps going. They implement `Error` so they render like every other
/// diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallStackAnomaly {
    #[error("Return at {address:08x} (line {line}) with an empty call stack")]
    StackUnderflow { address: u64, line: usize },

    #[error("Fetch at {address:08x} (line {line}) left all {popped} active frames")]
    UnreconciledExit {
        address: u64,
        line: usize,
        popped: usize,
    },

    #[error("Re-entry of active {symbol} at {address:08x} (line {line}) without a prologue")]
    ReentryWithoutPrologue {
        symbol: String,
        address: u64,
        line: usize,
    },
}

impl CallStackAnomaly {
    /// Stable kind name used for per-kind counters
    pub fn kind(&self) -> &'static str {
        match self {
            CallStackAnomaly::StackUnderflow { .. } => "stack_underflow",
            CallStackAnomaly::UnreconciledExit { .. } => "unreconciled_exit",
            CallStackAnomaly::ReentryWithoutPrologue { .. } => "reentry_without_prologue",
        }
    }

    /// Input line the anomaly was detected on
    pub fn line(&self) -> usize {
        match self {
            CallStackAnomaly::StackUnderflow { line, .. }
            | CallStackAnomaly::UnreconciledExit { line, .. }
            | CallStackAnomaly::ReentryWithoutPrologue { line, .. } => *line,
        }
    }
}
