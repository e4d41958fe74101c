//! Single-pass annotation driver.
//!
//! Reads the trace line by line, parses each line, feeds the tracker and the
//! watcher, and writes the line with its annotations before reading the next
//! one. Memory use is bounded by the call depth, not the trace length.

use super::access_watcher::AccessWatcher;
use super::annotation::{Annotation, Banner, InlineComment};
use super::call_stack::{CallStackTracker, CallTransition};
use super::summary::AnnotationSummary;
use crate::output::writer::{is_stack_pointer_write, AnnotatedWriter, StackFileWriter};
use crate::parser::{parse_line, EventKind, FetchState, LineReader, RawLine, TraceEvent};
use crate::tables::{SymbolTable, WatchList};
use crate::utils::config::{
    AnnotatorConfig, MAX_REPORTED_ANOMALIES, MISSING_SYMBOL_WARN_THRESHOLD, PARSE_WARN_LIMIT,
};
use crate::utils::error::{CallStackAnomaly, OutputError, ParseError};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::io::{self, BufRead, Write};

/// Encoding of the Thumb `WFI` instruction
const WFI_ENCODING: u64 = 0xbf30;

/// Streams a trace through the tracker and watcher
pub struct Annotator<'a> {
    symbols: &'a SymbolTable,
    tracker: CallStackTracker<'a>,
    watcher: AccessWatcher<'a>,
    config: AnnotatorConfig,
    summary: AnnotationSummary,
    anomalies: Vec<CallStackAnomaly>,
    entered: HashSet<u64>,
    last_timestamp: Option<u64>,
}

impl<'a> Annotator<'a> {
    pub fn new(symbols: &'a SymbolTable, watch: &'a WatchList, config: AnnotatorConfig) -> Self {
        Self {
            symbols,
            tracker: CallStackTracker::new(symbols),
            watcher: AccessWatcher::new(watch),
            config,
            summary: AnnotationSummary::default(),
            anomalies: Vec::new(),
            entered: HashSet::new(),
            last_timestamp: None,
        }
    }

    /// Annotate a whole trace
    ///
    /// **Public** - main entry point for annotation
    ///
    /// # Arguments
    /// * `input` - Trace reader
    /// * `output` - Destination for the annotated trace
    ///
    /// # Returns
    /// Counters for the run
    ///
    /// # Errors
    /// * `OutputError::ReadFailed` - Input could not be read
    /// * `OutputError::WriteFailed` - Output could not be written
    pub fn annotate<R: BufRead, W: Write>(
        &mut self,
        input: R,
        output: W,
    ) -> Result<AnnotationSummary, OutputError> {
        self.run(input, output, None::<&mut StackFileWriter<io::Sink>>)
    }

    /// Annotate a whole trace and copy stack pointer writes to a side file
    ///
    /// **Public** - used when a stack file is requested
    pub fn annotate_with_stack_file<R: BufRead, W: Write, S: Write>(
        &mut self,
        input: R,
        output: W,
        stack: &mut StackFileWriter<S>,
    ) -> Result<AnnotationSummary, OutputError> {
        self.run(input, output, Some(stack))
    }

    fn run<R: BufRead, W: Write, S: Write>(
        &mut self,
        input: R,
        output: W,
        mut stack: Option<&mut StackFileWriter<S>>,
    ) -> Result<AnnotationSummary, OutputError> {
        let mut writer = AnnotatedWriter::new(output, self.config.comment_padding);

        for raw in LineReader::new(input) {
            let raw = raw.map_err(OutputError::ReadFailed)?;
            let (event, annotations) = self.process_line(&raw);

            writer.write_line(&raw, &annotations)?;

            if let (Some(stack), EventKind::RegisterWrite(register)) = (stack.as_deref_mut(), &event.kind) {
                if is_stack_pointer_write(register) {
                    let function = self.tracker.current().map(|f| f.symbol.name.as_str());
                    stack.record(&raw, function)?;
                }
            }

            let interval = self.config.progress_interval;
            if interval > 0 && self.summary.lines % interval == 0 {
                info!(
                    "Processed {} lines (call depth {})",
                    self.summary.lines,
                    self.tracker.depth()
                );
            }
        }

        writer.flush()?;
        if let Some(stack) = stack {
            stack.flush()?;
        }

        Ok(self.finish())
    }

    /// Parse one line and decide what to write around it
    ///
    /// **Public** - the per-line step of `annotate`, exposed for callers that
    /// drive their own output
    pub fn process_line(&mut self, raw: &RawLine) -> (TraceEvent, Vec<Annotation>) {
        self.summary.lines += 1;

        let event = match raw.text() {
            Some(text) => match parse_line(text, raw.number, self.last_timestamp) {
                Ok(event) => {
                    if event.timestamp.is_some() {
                        self.last_timestamp = event.timestamp;
                    }
                    event
                }
                Err(err) => {
                    self.record_parse_error(raw.number, &err);
                    TraceEvent::opaque(raw.number, text)
                }
            },
            None => {
                self.record_parse_error(raw.number, &ParseError::InvalidEncoding);
                TraceEvent::opaque(raw.number, String::from_utf8_lossy(&raw.content))
            }
        };

        self.summary.record_event(&event.kind);
        let annotations = self.annotate_event(&event);
        (event, annotations)
    }

    fn annotate_event(&mut self, event: &TraceEvent) -> Vec<Annotation> {
        let mut annotations = Vec::new();

        if let Some(fetch) = event.as_fetch() {
            if self.symbols.containing(fetch.address).is_none() {
                self.summary.unresolved_fetches += 1;
            }
            if fetch.state != FetchState::Skipped
                && fetch.is_push()
                && self.symbols.entry_at(fetch.address).is_none()
            {
                self.summary.unresolved_prologues += 1;
                debug!(
                    "Prologue at {:08x} (line {}) is not a known entry",
                    fetch.address, event.line_number
                );
                if self.summary.unresolved_prologues == MISSING_SYMBOL_WARN_THRESHOLD + 1 {
                    warn!(
                        "More than {} prologues outside known functions; the list file may not match this trace",
                        MISSING_SYMBOL_WARN_THRESHOLD
                    );
                }
            }
        }

        let observation = self.tracker.observe(event);

        for transition in &observation.transitions {
            self.summary.record_transition(transition);
            if let CallTransition::Enter { symbol, .. } = transition {
                self.entered.insert(symbol.entry);
            }
            annotations.push(Annotation::Banner(Banner::from_transition(
                transition,
                &self.config,
            )));
        }

        for anomaly in observation.anomalies {
            self.summary.record_anomaly(&anomaly);
            if self.anomalies.len() < MAX_REPORTED_ANOMALIES {
                self.anomalies.push(anomaly);
            }
        }

        if let Some(access) = self.watcher.inspect(event) {
            self.summary.access_annotations += 1;
            annotations.push(Annotation::Inline(InlineComment::Access(access)));
        }

        if self.config.source_hints {
            if let Some(hint) = self.source_hint(event) {
                self.summary.source_hints += 1;
                annotations.push(Annotation::Inline(InlineComment::Disassembly(hint)));
            }
        }

        annotations
    }

    /// Listing disassembly for a fetch line that printed none
    fn source_hint(&self, event: &TraceEvent) -> Option<String> {
        let fetch = event.as_fetch()?;
        if fetch.state != FetchState::NotInThumbState {
            return None;
        }
        match self.symbols.disassembly_at(fetch.address) {
            Some(text) => Some(text.trim_end().to_string()),
            None if fetch.encoding.digits == 4 && fetch.encoding.value == WFI_ENCODING => {
                Some("WFI".to_string())
            }
            None => None,
        }
    }

    fn record_parse_error(&mut self, line: usize, err: &ParseError) {
        self.summary.parse_errors += 1;
        if self.summary.parse_errors <= PARSE_WARN_LIMIT {
            warn!("Line {}: {}", line, err);
        } else {
            debug!("Line {}: {}", line, err);
        }
        if self.summary.parse_errors == PARSE_WARN_LIMIT + 1 {
            warn!("Further parse errors are logged at debug level");
        }
    }

    /// Close the run and return its counters
    pub fn finish(&mut self) -> AnnotationSummary {
        self.summary.open_frames = self.tracker.depth();
        self.summary.functions_entered = self.entered.len();

        if !self.summary.is_balanced() {
            debug!(
                "{} frames still open at end of trace",
                self.summary.open_frames
            );
        }

        self.summary.clone()
    }

    /// Anomalies recorded so far, capped for the run report
    pub fn anomalies(&self) -> &[CallStackAnomaly] {
        &self.anomalies
    }

    /// Live call stack depth
    pub fn depth(&self) -> usize {
        self.tracker.depth()
    }
}
