//! Run counters and the persisted run report.
//!
//! The annotator fills an `AnnotationSummary` while it streams; the command
//! layer wraps it in a `RunReport` when a JSON report is requested.

use super::call_stack::CallTransition;
use crate::parser::EventKind;
use crate::utils::config::{MAX_REPORTED_ANOMALIES, MISSING_SYMBOL_WARN_THRESHOLD, SCHEMA_VERSION};
use crate::utils::error::CallStackAnomaly;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Counters collected over one annotation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSummary {
    /// Input lines read
    pub lines: u64,

    pub instruction_fetches: u64,
    pub memory_reads: u64,
    pub memory_writes: u64,
    pub register_writes: u64,

    /// Blank, comment and unknown-tag lines, plus lines that failed to parse
    pub opaque_lines: u64,

    pub parse_errors: u64,

    pub call_entries: u64,
    pub call_exits: u64,
    pub resumes: u64,
    pub adopted_frames: u64,

    /// Deepest call stack observed
    pub max_depth: usize,

    /// Frames still active when the input ended
    pub open_frames: usize,

    /// Distinct functions entered at least once
    pub functions_entered: usize,

    pub access_annotations: u64,
    pub source_hints: u64,

    /// Fetches outside every known function
    pub unresolved_fetches: u64,

    /// Prologue instructions at addresses that are not known entries
    pub unresolved_prologues: u64,

    /// Anomaly kind -> count
    pub anomalies: BTreeMap<String, u64>,
}

impl AnnotationSummary {
    /// Count one event by kind
    pub fn record_event(&mut self, kind: &EventKind) {
        match kind {
            EventKind::InstructionFetch(_) => self.instruction_fetches += 1,
            EventKind::MemoryRead(_) => self.memory_reads += 1,
            EventKind::MemoryWrite(_) => self.memory_writes += 1,
            EventKind::RegisterWrite(_) => self.register_writes += 1,
            EventKind::Opaque => self.opaque_lines += 1,
        }
    }

    pub fn record_transition(&mut self, transition: &CallTransition<'_>) {
        match transition {
            CallTransition::Enter { depth, .. } => {
                self.call_entries += 1;
                self.max_depth = self.max_depth.max(*depth);
            }
            CallTransition::Exit { .. } => self.call_exits += 1,
            CallTransition::Resume { .. } => self.resumes += 1,
            CallTransition::Adopt { depth, .. } => {
                self.adopted_frames += 1;
                self.max_depth = self.max_depth.max(*depth);
            }
        }
    }

    pub fn record_anomaly(&mut self, anomaly: &CallStackAnomaly) {
        *self.anomalies.entry(anomaly.kind().to_string()).or_insert(0) += 1;
    }

    pub fn total_anomalies(&self) -> u64 {
        self.anomalies.values().sum()
    }

    /// Every frame pushed was also popped
    pub fn is_balanced(&self) -> bool {
        self.open_frames == 0
    }

    /// Many prologues outside known entries usually means the list file is
    /// from a different build than the trace
    pub fn has_symbol_mismatch(&self) -> bool {
        self.unresolved_prologues > MISSING_SYMBOL_WARN_THRESHOLD
    }

    /// Get human-readable summary
    ///
    /// **Public** - for logging and the `--summary` flag
    pub fn summary(&self) -> String {
        format!(
            "Lines: {} | Fetches: {} | Calls: {} | Exits: {} | Max depth: {} | Watched: {} | Parse errors: {} | Anomalies: {}",
            self.lines,
            self.instruction_fetches,
            self.call_entries,
            self.call_exits,
            self.max_depth,
            self.access_annotations,
            self.parse_errors,
            self.total_anomalies()
        )
    }
}

/// One anomaly as stored in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub kind: String,
    pub line: usize,
    pub message: String,
}

impl From<&CallStackAnomaly> for AnomalyRecord {
    fn from(anomaly: &CallStackAnomaly) -> Self {
        Self {
            kind: anomaly.kind().to_string(),
            line: anomaly.line(),
            message: anomaly.to_string(),
        }
    }
}

/// JSON run report
///
/// **Public** - written by `--report`, read back by tooling and tests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Report schema version
    pub version: String,

    pub trace_file: String,
    pub list_file: String,
    pub output_file: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_file: Option<String>,

    /// RFC 3339 creation time
    pub generated_at: String,

    pub summary: AnnotationSummary,

    /// First anomalies of the run, in trace order
    pub anomalies: Vec<AnomalyRecord>,

    /// Anomalies left out of `anomalies`
    pub anomalies_truncated: u64,
}

impl RunReport {
    /// Build a report stamped with the current time
    ///
    /// **Public** - called by the annotate command after the run
    pub fn new(
        trace_file: impl Into<String>,
        list_file: impl Into<String>,
        output_file: impl Into<String>,
        summary: AnnotationSummary,
        anomalies: &[CallStackAnomaly],
    ) -> Self {
        use chrono::Utc;

        let records: Vec<AnomalyRecord> = anomalies
            .iter()
            .take(MAX_REPORTED_ANOMALIES)
            .map(AnomalyRecord::from)
            .collect();
        let truncated = summary
            .total_anomalies()
            .saturating_sub(records.len() as u64);

        Self {
            version: SCHEMA_VERSION.to_string(),
            trace_file: trace_file.into(),
            list_file: list_file.into(),
            output_file: output_file.into(),
            stack_file: None,
            generated_at: Utc::now().to_rfc3339(),
            summary,
            anomalies: records,
            anomalies_truncated: truncated,
        }
    }

    pub fn with_stack_file(mut self, stack_file: impl Into<String>) -> Self {
        self.stack_file = Some(stack_file.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{AddressRange, Symbol};

    #[test]
    fn test_record_transitions() {
        let symbol = Symbol::new("f", 0x100, AddressRange::new(0x100, 0x110));
        let mut summary = AnnotationSummary::default();

        summary.record_transition(&CallTransition::Enter {
            symbol: &symbol,
            caller_chain: vec!["g", "f"],
            depth: 2,
            timestamp: None,
        });
        summary.record_transition(&CallTransition::Exit { symbol: &symbol, depth: 2 });

        assert_eq!(summary.call_entries, 1);
        assert_eq!(summary.call_exits, 1);
        assert_eq!(summary.max_depth, 2);
    }

    #[test]
    fn test_anomaly_counts_are_per_kind() {
        let mut summary = AnnotationSummary::default();
        summary.record_anomaly(&CallStackAnomaly::StackUnderflow { address: 0, line: 1 });
        summary.record_anomaly(&CallStackAnomaly::StackUnderflow { address: 0, line: 2 });
        summary.record_anomaly(&CallStackAnomaly::UnreconciledExit {
            address: 0,
            line: 3,
            popped: 1,
        });

        assert_eq!(summary.anomalies.get("stack_underflow"), Some(&2));
        assert_eq!(summary.anomalies.get("unreconciled_exit"), Some(&1));
        assert_eq!(summary.total_anomalies(), 3);
    }

    #[test]
    fn test_symbol_mismatch_threshold() {
        let mut summary = AnnotationSummary {
            unresolved_prologues: 5,
            ..Default::default()
        };
        assert!(!summary.has_symbol_mismatch());
        summary.unresolved_prologues = 6;
        assert!(summary.has_symbol_mismatch());
    }

    #[test]
    fn test_report_caps_anomaly_records() {
        let anomalies: Vec<CallStackAnomaly> = (0..150)
            .map(|line| CallStackAnomaly::StackUnderflow { address: 0, line })
            .collect();
        let mut summary = AnnotationSummary::default();
        for anomaly in &anomalies {
            summary.record_anomaly(anomaly);
        }

        let report = RunReport::new("t.txt", "l.txt", "o.txt", summary, &anomalies);
        assert_eq!(report.version, SCHEMA_VERSION);
        assert_eq!(report.anomalies.len(), MAX_REPORTED_ANOMALIES);
        assert_eq!(report.anomalies_truncated, 50);
        assert_eq!(report.anomalies[0].kind, "stack_underflow");
    }
}
