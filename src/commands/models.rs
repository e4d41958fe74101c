use crate::utils::config::{AnnotatorConfig, DEFAULT_CHAIN_LIMIT, DEFAULT_COMMENT_PADDING};
use std::path::PathBuf;

/// Arguments for the annotate command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnnotateArgs {
    /// Input Tarmac trace
    pub trace: PathBuf,

    /// Linker list file (discovered beside the trace when absent)
    pub list_file: Option<PathBuf>,

    /// Annotated output (timestamped name beside the trace when absent)
    pub output: Option<PathBuf>,

    /// C source tree scanned for prototypes
    pub source_path: Option<PathBuf>,

    /// TOML watch list of addresses and registers
    pub watch_list: Option<PathBuf>,

    /// Also write the stack pointer side file
    pub stack_file: bool,

    /// Append listing disassembly to reduced-information fetch lines
    pub source_hints: bool,

    /// Source path substrings skipped by the prototype scan
    pub exclude: Vec<String>,

    /// Spaces before inline comments
    pub comment_padding: usize,

    /// Caller chain depth printed before abbreviating
    pub chain_limit: usize,

    /// Output path for the JSON run report (optional)
    pub report: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnnotateArgs {
    fn default() -> Self {
        Self {
            trace: PathBuf::new(),
            list_file: None,
            output: None,
            source_path: None,
            watch_list: None,
            stack_file: false,
            source_hints: false,
            exclude: Vec::new(),
            comment_padding: DEFAULT_COMMENT_PADDING,
            chain_limit: DEFAULT_CHAIN_LIMIT,
            report: None,
            print_summary: false,
        }
    }
}

impl AnnotateArgs {
    /// Engine configuration derived from the arguments
    pub fn annotator_config(&self) -> AnnotatorConfig {
        AnnotatorConfig::new()
            .with_comment_padding(self.comment_padding)
            .with_chain_limit(self.chain_limit)
            .with_source_hints(self.source_hints)
    }
}

/// Files an annotate run reads and writes, after defaults are applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatePaths {
    pub trace: PathBuf,
    pub list_file: PathBuf,
    pub output: PathBuf,
    pub stack_file: Option<PathBuf>,
}
