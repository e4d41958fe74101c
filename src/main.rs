//! Tarmac Annotate CLI
//!
//! Annotates Tarmac instruction traces with call trees, prototypes and
//! watched accesses.

use anyhow::Result;
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use tarmac_annotate::commands::{
    display_version, execute_annotate, execute_symbols, validate_args, AnnotateArgs, SymbolsArgs,
};
use tarmac_annotate::utils::config::{DEFAULT_CHAIN_LIMIT, DEFAULT_COMMENT_PADDING};

/// Tarmac Annotate - call trees and watched accesses for Tarmac traces
#[derive(Parser, Debug)]
#[command(name = "tarmac-annotate")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Annotate a trace
    Annotate {
        /// Input Tarmac trace
        trace: PathBuf,

        /// Linker list file (default: Project_Assembly.txt or the first .txt beside the trace)
        list: Option<PathBuf>,

        /// Annotated output (default: <trace>-update-<timestamp>.<ext>)
        output: Option<PathBuf>,

        /// C source tree scanned for function prototypes
        #[arg(short, long, env = "TARMAC_SOURCE_PATH")]
        path: Option<PathBuf>,

        /// TOML watch list of addresses and registers
        #[arg(short, long, env = "TARMAC_WATCH_LIST")]
        watch: Option<PathBuf>,

        /// Also write a stack pointer trace (<trace>-stack.<ext>)
        #[arg(long)]
        stack: bool,

        /// Annotate reduced-information fetch lines with listing disassembly
        #[arg(long)]
        source: bool,

        /// Skip source paths containing this text (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Spaces before inline comments
        #[arg(long, default_value_t = DEFAULT_COMMENT_PADDING)]
        padding: usize,

        /// Caller chain depth printed in full before abbreviating
        #[arg(long, default_value_t = DEFAULT_CHAIN_LIMIT)]
        chain_limit: usize,

        /// Output path for a JSON run report
        #[arg(long)]
        report: Option<PathBuf>,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Print the symbol table resolved from a list file
    Symbols {
        /// Linker list file
        list: PathBuf,

        /// C source tree scanned for function prototypes
        #[arg(short, long, env = "TARMAC_SOURCE_PATH")]
        path: Option<PathBuf>,

        /// Skip source paths containing this text (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    // Execute command
    match cli.command {
        Commands::Annotate {
            trace,
            list,
            output,
            path,
            watch,
            stack,
            source,
            exclude,
            padding,
            chain_limit,
            report,
            summary,
        } => {
            let args = AnnotateArgs {
                trace,
                list_file: list,
                output,
                source_path: path,
                watch_list: watch,
                stack_file: stack,
                source_hints: source,
                exclude,
                comment_padding: padding,
                chain_limit,
                report,
                print_summary: summary,
            };

            // Validate args first
            validate_args(&args)?;

            execute_annotate(args)?;
        }

        Commands::Symbols {
            list,
            path,
            exclude,
        } => {
            execute_symbols(SymbolsArgs {
                list_file: list,
                source_path: path,
                exclude,
            })?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
