//! Terminal rendering of run summaries.
//!
//! Provides a human-readable summary of an annotation run with colour cues
//! for anomalies and list file mismatches.

use crate::engine::summary::AnnotationSummary;
use colored::*;

const SEPARATOR: &str = "---------------------------------------------------\n";

/// Render a summary for the terminal
pub fn render_terminal_summary(summary: &AnnotationSummary, output_file: &str) -> String {
    let mut out = String::new();

    out.push_str(&render_header(output_file));
    out.push_str(&render_events(summary));
    out.push_str(&render_calls(summary));
    out.push_str(&render_anomalies(summary));
    out.push_str(&render_status(summary));

    out
}

fn render_header(output_file: &str) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(&"Trace Annotation Summary".bold().to_string());
    out.push('\n');
    out.push_str(SEPARATOR);
    out.push_str(&format!("Output: {}\n", output_file));
    out.push_str(SEPARATOR);
    out
}

fn render_events(summary: &AnnotationSummary) -> String {
    format!(
        "Lines:              {}\n  Fetches:          {}\n  Memory reads:     {}\n  Memory writes:    {}\n  Register writes:  {}\n  Other:            {}\n",
        summary.lines,
        summary.instruction_fetches,
        summary.memory_reads,
        summary.memory_writes,
        summary.register_writes,
        summary.opaque_lines
    )
}

fn render_calls(summary: &AnnotationSummary) -> String {
    let mut out = format!(
        "\nCalls:              {}\n  Exits:            {}\n  Resumes:          {}\n  Adopted frames:   {}\n  Max depth:        {}\n  Open at end:      {}\n  Functions:        {}\n",
        summary.call_entries,
        summary.call_exits,
        summary.resumes,
        summary.adopted_frames,
        summary.max_depth,
        summary.open_frames,
        summary.functions_entered
    );
    out.push_str(&format!(
        "\nWatched accesses:   {}\nSource hints:       {}\n",
        summary.access_annotations, summary.source_hints
    ));
    out
}

fn render_anomalies(summary: &AnnotationSummary) -> String {
    let mut out = String::new();

    if summary.parse_errors > 0 {
        out.push_str(&format!(
            "\n{} {}\n",
            "Parse errors:".yellow(),
            summary.parse_errors
        ));
    }

    if !summary.anomalies.is_empty() {
        out.push_str(&format!("\n{}\n", "Call stack anomalies:".yellow()));
        for (kind, count) in &summary.anomalies {
            out.push_str(&format!("  {}: {}\n", kind, count));
        }
    }

    if summary.unresolved_fetches > 0 {
        out.push_str(&format!(
            "\nFetches outside known functions: {}\n",
            summary.unresolved_fetches
        ));
    }
    out
}

fn render_status(summary: &AnnotationSummary) -> String {
    let mut out = String::new();
    out.push('\n');
    out.push_str(SEPARATOR);
    let status = if summary.has_symbol_mismatch() {
        format!(
            "STATUS: LIST FILE MISMATCH ({} prologues outside known functions)",
            summary.unresolved_prologues
        )
        .red()
        .bold()
    } else if summary.total_anomalies() > 0 || summary.parse_errors > 0 {
        format!(
            "STATUS: COMPLETED WITH WARNINGS ({} anomalies, {} parse errors)",
            summary.total_anomalies(),
            summary.parse_errors
        )
        .yellow()
        .bold()
    } else {
        "STATUS: OK".green().bold()
    };
    out.push_str(&status.to_string());
    out.push('\n');
    out
}
