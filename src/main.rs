//! Trace Report CLI
//!
//! Generates sorted, optionally hierarchical reports from performance
//! trace files: one section per monitored event type, grouped by
//! configurable sort keys.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

use trace_report::aggregator::keys::SORT_KEYS;
use trace_report::report::{
    parse_cpu_list, parse_id_list, parse_name_list, run_report, CallgraphRoot, ReportOptions,
};
use trace_report::utils::config::{DEFAULT_SORT_KEYS, DEFAULT_TRACE_FILE};

/// Trace Report - sample aggregation reports for performance traces
#[derive(Parser, Debug)]
#[command(name = "trace-report")]
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
    /// Generate a report from a trace file
    Report {
        /// Path of the trace file
        #[arg(short, long, default_value = DEFAULT_TRACE_FILE)]
        input: PathBuf,

        /// Report file name; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Sort keys, in grouping and display order
        /// (pid, tid, comm, dso, symbol, vaddr_in_file; with -b also
        /// dso_from, dso_to, symbol_from, symbol_to)
        #[arg(long, value_delimiter = ',')]
        sort: Option<Vec<String>>,

        /// Use branch-to addresses instead of instruction addresses.
        /// Only valid for traces recorded with branch stacks
        #[arg(short = 'b')]
        branch: bool,

        /// Print the overhead accumulated by appearing in call chains
        #[arg(long)]
        children: bool,

        /// Print the call graph, rooted at the caller or the callee
        #[arg(short = 'g', value_name = "MODE", num_args = 0..=1,
              default_missing_value = "caller")]
        callgraph: Option<String>,

        /// Print full call graph (one node per call site); default is brief
        #[arg(long)]
        full_callgraph: bool,

        /// Max stack frames shown when printing the call graph
        #[arg(long, default_value_t = u32::MAX)]
        max_stack: u32,

        /// Min percentage shown when printing the call graph
        #[arg(long, default_value_t = 0.0)]
        percent_limit: f64,

        /// Print the sample count for each row
        #[arg(short = 'n')]
        sample_count: bool,

        /// Report raw period counts instead of percentages
        #[arg(long)]
        raw_period: bool,

        /// Report in CSV format
        #[arg(long)]
        csv: bool,

        /// Report only for selected thread names (comma separated)
        #[arg(long)]
        comms: Option<String>,

        /// Report only on the selected cpus, e.g. 0,1 or 0-3
        #[arg(long)]
        cpus: Option<String>,

        /// Report only for selected process ids
        #[arg(long)]
        pids: Option<String>,

        /// Report only for selected thread ids
        #[arg(long)]
        tids: Option<String>,

        /// Report only for selected modules (comma separated)
        #[arg(long)]
        dsos: Option<String>,

        /// Report only for selected symbols (semicolon separated)
        #[arg(long)]
        symbols: Option<String>,

        /// Don't demangle symbol names
        #[arg(long)]
        no_demangle: bool,
    },

    /// List the recognized sort keys
    Keys,

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
        Commands::Report {
            input,
            output,
            sort,
            branch,
            children,
            callgraph,
            full_callgraph,
            max_stack,
            percent_limit,
            sample_count,
            raw_period,
            csv,
            comms,
            cpus,
            pids,
            tids,
            dsos,
            symbols,
            no_demangle,
        } => {
            let callgraph_root = match callgraph.as_deref() {
                Some("caller") | None => CallgraphRoot::Caller,
                Some("callee") => CallgraphRoot::Callee,
                Some(other) => anyhow::bail!("Unknown argument with -g option: {}", other),
            };

            let options = ReportOptions {
                input,
                output,
                sort_keys: sort.unwrap_or_else(|| {
                    DEFAULT_SORT_KEYS.iter().map(|s| s.to_string()).collect()
                }),
                use_branch_address: branch,
                accumulate_callchain: children || callgraph.is_some(),
                print_callgraph: callgraph.is_some(),
                callgraph_root,
                full_callgraph,
                max_stack,
                percent_limit,
                raw_period,
                print_sample_count: sample_count,
                csv,
                demangle: !no_demangle,
                cpu_filter: cpus.as_deref().map(parse_cpu_list).transpose()?.unwrap_or_default(),
                pid_filter: pids.as_deref().map(parse_id_list).transpose()?.unwrap_or_default(),
                tid_filter: tids.as_deref().map(parse_id_list).transpose()?.unwrap_or_default(),
                comm_filter: comms
                    .as_deref()
                    .map(|s| parse_name_list(s, ','))
                    .unwrap_or_default(),
                dso_filter: dsos
                    .as_deref()
                    .map(|s| parse_name_list(s, ','))
                    .unwrap_or_default(),
                symbol_filter: symbols
                    .as_deref()
                    .map(|s| parse_name_list(s, ';'))
                    .unwrap_or_default(),
            };

            run_report(&options).context("Failed to generate report")?;
        }

        Commands::Keys => {
            display_keys();
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}

/// List the recognized sort keys
///
/// **Private** - internal command implementation
fn display_keys() {
    println!("Recognized sort keys:");
    for key in SORT_KEYS {
        let note = if key.branch_only {
            "  (requires -b)"
        } else {
            ""
        };
        println!("  {:14} -- {}{}", key.name, key.label, note);
    }
    println!();
    println!("Default sort keys: {}", DEFAULT_SORT_KEYS.join(","));
}

/// Display version information
///
/// **Private** - internal command implementation
fn display_version() {
    println!("Trace Report v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Sample aggregation and report generation for performance traces.");
}
