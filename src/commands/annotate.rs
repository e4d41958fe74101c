//! Annotate command implementation.
//!
//! The annotate command:
//! 1. Loads the list file
//! 2. Scans the source tree for prototypes
//! 3. Loads the watch list
//! 4. Streams the trace through the annotator
//! 5. Writes the run report

use super::models::{AnnotateArgs, AnnotatePaths};
use crate::engine::{AnnotationSummary, Annotator, RunReport};
use crate::output::{create_output_file, render_terminal_summary, write_report, StackFileWriter};
use crate::tables::{load_list_file, load_watch_list, scan_source_tree, ScanOptions, WatchList};
use crate::utils::config::{DEFAULT_LIST_FILENAME, LIST_FILE_EXTENSION};
use anyhow::{anyhow, Context, Result};
use chrono::Local;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Largest accepted inline comment padding
const MAX_COMMENT_PADDING: usize = 200;

/// Execute the annotate command
///
/// **Public** - main entry point called from main.rs
///
/// # Arguments
/// * `args` - Annotate command arguments
///
/// # Returns
/// Counters for the run
///
/// # Errors
/// * Unreadable trace, list file, source tree or watch list
/// * Conflicting symbol table
/// * Output write failures
pub fn execute_annotate(args: AnnotateArgs) -> Result<AnnotationSummary> {
    let start_time = Instant::now();

    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let paths = resolve_paths(&args, &stamp)?;

    info!("Trace file:  {}", paths.trace.display());
    info!("List file:   {}", paths.list_file.display());
    info!("Output file: {}", paths.output.display());
    if let Some(stack) = &paths.stack_file {
        info!("Stack file:  {}", stack.display());
    }

    // Step 1: List file
    info!("Step 1/5: Loading list file...");
    let listing = load_list_file(&paths.list_file)
        .with_context(|| format!("Failed to load list file {}", paths.list_file.display()))?;

    // Step 2: Prototypes
    let prototypes = match &args.source_path {
        Some(root) => {
            info!("Step 2/5: Scanning source tree for prototypes...");
            let options = ScanOptions::default().with_exclude(args.exclude.clone());
            let index = scan_source_tree(root, &options)
                .with_context(|| format!("Failed to scan source tree {}", root.display()))?;
            Some(index)
        }
        None => {
            info!("Step 2/5: Skipping prototype scan (no source path)");
            None
        }
    };

    let symbols = listing
        .resolve(prototypes.as_ref())
        .context("List file produced a conflicting symbol table")?;

    if symbols.is_empty() {
        warn!("No functions found in list file; no call banners will be produced");
    } else {
        info!("Resolved {} functions", symbols.len());
    }

    // Step 3: Watch list
    let watch = match &args.watch_list {
        Some(path) => {
            info!("Step 3/5: Loading watch list...");
            load_watch_list(path)
                .with_context(|| format!("Failed to load watch list {}", path.display()))?
        }
        None => {
            info!("Step 3/5: Skipping watch list (none given)");
            WatchList::new()
        }
    };

    // Step 4: Annotate
    info!("Step 4/5: Annotating trace...");
    let input = File::open(&paths.trace)
        .with_context(|| format!("Failed to open trace {}", paths.trace.display()))?;
    let output = create_output_file(&paths.output)
        .with_context(|| format!("Failed to create output {}", paths.output.display()))?;

    let mut annotator = Annotator::new(&symbols, &watch, args.annotator_config());

    let summary = match &paths.stack_file {
        Some(stack_path) => {
            let sink = create_output_file(stack_path)
                .with_context(|| format!("Failed to create stack file {}", stack_path.display()))?;
            let mut stack = StackFileWriter::new(sink);
            let summary = annotator
                .annotate_with_stack_file(BufReader::new(input), output, &mut stack)
                .context("Failed to annotate trace")?;
            info!(
                "✓ Stack file written to: {} ({} entries)",
                stack_path.display(),
                stack.entries()
            );
            summary
        }
        None => annotator
            .annotate(BufReader::new(input), output)
            .context("Failed to annotate trace")?,
    };

    info!("✓ Annotated trace written to: {}", paths.output.display());
    info!("Annotation: {}", summary.summary());

    if summary.has_symbol_mismatch() {
        warn!(
            "{} prologues outside known functions; check that {} matches the traced build",
            summary.unresolved_prologues,
            paths.list_file.display()
        );
    }

    // Step 5: Report
    match &args.report {
        Some(report_path) => {
            info!("Step 5/5: Writing run report...");
            let mut report = RunReport::new(
                paths.trace.display().to_string(),
                paths.list_file.display().to_string(),
                paths.output.display().to_string(),
                summary.clone(),
                annotator.anomalies(),
            );
            if let Some(stack) = &paths.stack_file {
                report = report.with_stack_file(stack.display().to_string());
            }
            write_report(&report, report_path).context("Failed to write run report")?;
            info!("✓ Run report written to: {}", report_path.display());
        }
        None => info!("Step 5/5: Skipping run report (not requested)"),
    }

    if args.print_summary {
        println!(
            "{}",
            render_terminal_summary(&summary, &paths.output.display().to_string())
        );
    }

    let elapsed = start_time.elapsed();
    info!("Annotation completed in {:.2}s", elapsed.as_secs_f64());

    Ok(summary)
}

/// Apply defaults for the list file, output and stack file
///
/// **Public** - split out so naming rules can be checked without a run
///
/// # Arguments
/// * `args` - Annotate arguments
/// * `stamp` - `YYYYMMDD-HHMMSS` inserted into default output names
///
/// # Errors
/// No list file was given and none could be found beside the trace
pub fn resolve_paths(args: &AnnotateArgs, stamp: &str) -> Result<AnnotatePaths> {
    let list_file = match &args.list_file {
        Some(path) => path.clone(),
        None => find_list_file(&args.trace).ok_or_else(|| {
            anyhow!(
                "No list file given and none found beside {} (looked for {} or any .{} file)",
                args.trace.display(),
                DEFAULT_LIST_FILENAME,
                LIST_FILE_EXTENSION
            )
        })?,
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.trace, stamp));

    let stack_file = args.stack_file.then(|| stack_file_path(&args.trace));

    Ok(AnnotatePaths {
        trace: args.trace.clone(),
        list_file,
        output,
        stack_file,
    })
}

/// `Project_Assembly.txt` beside the trace, else the first other `.txt` there
///
/// **Public** - list file discovery
pub fn find_list_file(trace: &Path) -> Option<PathBuf> {
    let dir = trace
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let default = dir.join(DEFAULT_LIST_FILENAME);
    if default.is_file() {
        return Some(default);
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case(LIST_FILE_EXTENSION))
                && path.file_name() != trace.file_name()
        })
        .collect();
    candidates.sort();

    debug!("List file candidates: {:?}", candidates);
    candidates.into_iter().next()
}

/// `run.log` -> `run-update-20250814-093000.log`
pub fn default_output_path(trace: &Path, stamp: &str) -> PathBuf {
    with_name_suffix(trace, &format!("-update-{}", stamp))
}

/// `run.log` -> `run-stack.log`
pub fn stack_file_path(trace: &Path) -> PathBuf {
    with_name_suffix(trace, "-stack")
}

/// Insert `suffix` between the file stem and its extension
///
/// **Private** - shared by the default output names
fn with_name_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let name = match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };

    path.with_file_name(name)
}

/// Validate annotate arguments
///
/// **Public** - can be called before execute_annotate for early validation
///
/// # Returns
/// Ok if arguments are valid, Err with message if not
pub fn validate_args(args: &AnnotateArgs) -> Result<()> {
    if args.trace.as_os_str().is_empty() {
        anyhow::bail!("Trace file cannot be empty");
    }

    if !args.trace.is_file() {
        anyhow::bail!("Trace file not found: {}", args.trace.display());
    }

    if let Some(list) = &args.list_file {
        if !list.is_file() {
            anyhow::bail!("List file not found: {}", list.display());
        }
    }

    if let Some(output) = &args.output {
        if output == &args.trace {
            anyhow::bail!("Output file must differ from the trace file");
        }
    }

    if let Some(root) = &args.source_path {
        if !root.is_dir() {
            anyhow::bail!("Source path is not a directory: {}", root.display());
        }
    }

    if let Some(watch) = &args.watch_list {
        if !watch.is_file() {
            anyhow::bail!("Watch list not found: {}", watch.display());
        }
    }

    if args.comment_padding > MAX_COMMENT_PADDING {
        anyhow::bail!("Comment padding is too large (max {})", MAX_COMMENT_PADDING);
    }

    if args.chain_limit < 2 {
        anyhow::bail!("Chain limit must be at least 2");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args_for(trace: PathBuf) -> AnnotateArgs {
        AnnotateArgs {
            trace,
            ..Default::default()
        }
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("runs/tarmac.log"), "20250814-093000"),
            PathBuf::from("runs/tarmac-update-20250814-093000.log")
        );
        assert_eq!(
            default_output_path(Path::new("tarmac"), "20250814-093000"),
            PathBuf::from("tarmac-update-20250814-093000")
        );
    }

    #[test]
    fn test_stack_file_path() {
        assert_eq!(
            stack_file_path(Path::new("runs/tarmac.log")),
            PathBuf::from("runs/tarmac-stack.log")
        );
    }

    #[test]
    fn test_find_default_list_file() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("tarmac.log");
        fs::write(&trace, "").unwrap();
        fs::write(dir.path().join("Other.txt"), "").unwrap();
        fs::write(dir.path().join(DEFAULT_LIST_FILENAME), "").unwrap();

        assert_eq!(
            find_list_file(&trace),
            Some(dir.path().join(DEFAULT_LIST_FILENAME))
        );
    }

    #[test]
    fn test_find_first_txt_skipping_trace() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("a_trace.txt");
        fs::write(&trace, "").unwrap();
        fs::write(dir.path().join("b_listing.txt"), "").unwrap();
        fs::write(dir.path().join("c_listing.txt"), "").unwrap();

        assert_eq!(find_list_file(&trace), Some(dir.path().join("b_listing.txt")));
    }

    #[test]
    fn test_resolve_paths_without_list_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("tarmac.log");
        fs::write(&trace, "").unwrap();

        assert!(resolve_paths(&args_for(trace), "20250814-093000").is_err());
    }

    #[test]
    fn test_resolve_paths_applies_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("tarmac.log");
        let list = dir.path().join("app.txt");
        let args = AnnotateArgs {
            list_file: Some(list.clone()),
            stack_file: true,
            ..args_for(trace.clone())
        };

        let paths = resolve_paths(&args, "20250814-093000").unwrap();
        assert_eq!(paths.list_file, list);
        assert_eq!(
            paths.output,
            dir.path().join("tarmac-update-20250814-093000.log")
        );
        assert_eq!(paths.stack_file, Some(dir.path().join("tarmac-stack.log")));
    }

    #[test]
    fn test_validate_args() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("tarmac.log");
        fs::write(&trace, "").unwrap();

        assert!(validate_args(&args_for(trace.clone())).is_ok());
        assert!(validate_args(&args_for(dir.path().join("missing.log"))).is_err());
        assert!(validate_args(&AnnotateArgs {
            output: Some(trace.clone()),
            ..args_for(trace.clone())
        })
        .is_err());
        assert!(validate_args(&AnnotateArgs {
            chain_limit: 1,
            ..args_for(trace.clone())
        })
        .is_err());
        assert!(validate_args(&AnnotateArgs {
            comment_padding: 500,
            ..args_for(trace)
        })
        .is_err());
    }
}
