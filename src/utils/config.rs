//! Configuration and constants for the annotator.

/// Current run report schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

// Banner rules framing call transitions
pub const BANNER_ENTRY_RULE: &str = "@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@@";
pub const BANNER_EXIT_RULE: &str = ">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>>";
pub const BANNER_RESUME_RULE: &str = "<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<<";

/// Spaces between the original line and an inline `;` comment
pub const DEFAULT_COMMENT_PADDING: usize = 24;

/// Deepest caller chain printed in full; deeper chains are abbreviated
pub const DEFAULT_CHAIN_LIMIT: usize = 8;

/// Indentation of the caller chain inside an entry banner
pub const CHAIN_INDENT: &str = "    ";

/// List file looked up next to the trace when none is given
pub const DEFAULT_LIST_FILENAME: &str = "Project_Assembly.txt";
pub const LIST_FILE_EXTENSION: &str = "txt";

/// Lines between progress log messages
pub const PROGRESS_INTERVAL: u64 = 100_000;

/// Parse errors reported at warn level before dropping to debug
pub const PARSE_WARN_LIMIT: u64 = 10;

/// Anomaly records kept in the run report
pub const MAX_REPORTED_ANOMALIES: usize = 100;

/// More unresolved prologues than this suggests the list file and trace are out of sync
pub const MISSING_SYMBOL_WARN_THRESHOLD: u64 = 5;

/// Source file extensions scanned for prototypes by default
pub const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["c"];

/// Register aliases that mark stack pointer writes for the stack file
pub const STACK_POINTER_ALIASES: &[&str] = &["MSP", "PSP"];
pub const STACK_POINTER_REGISTERS: &[&str] = &["r13", "sp"];

/// Annotator configuration
#[derive(Debug, Clone)]
pub struct AnnotatorConfig {
    /// Spaces inserted before an inline comment
    pub comment_padding: usize,

    /// Caller chain depth printed before abbreviating with `...`
    pub chain_limit: usize,

    /// Append list-file disassembly to reduced-information fetch lines
    pub source_hints: bool,

    /// Lines between progress messages (0 disables progress)
    pub progress_interval: u64,
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            comment_padding: DEFAULT_COMMENT_PADDING,
            chain_limit: DEFAULT_CHAIN_LIMIT,
            source_hints: false,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl AnnotatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_comment_padding(mut self, padding: usize) -> Self {
        self.comment_padding = padding;
        self
    }

    pub fn with_chain_limit(mut self, limit: usize) -> Self {
        // A limit below 2 could not show the function itself after "..."
        self.chain_limit = limit.max(2);
        self
    }

    pub fn with_source_hints(mut self, enabled: bool) -> Self {
        self.source_hints = enabled;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_rule_widths() {
        assert_eq!(BANNER_ENTRY_RULE.len(), 120);
        assert_eq!(BANNER_EXIT_RULE.len(), 80);
        assert_eq!(BANNER_RESUME_RULE.len(), 80);
    }

    #[test]
    fn test_chain_limit_floor() {
        let config = AnnotatorConfig::new().with_chain_limit(0);
        assert_eq!(config.chain_limit, 2);
    }
}
