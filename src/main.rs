mod commands;
mod util;

use crate::commands::{count, inspect, CommandError, CountArgs};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use stv_count::logging::{diagnostics_layer, trace_layer};
use stv_count::tabulator::CountError;
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[clap(
    name = "stv-count",
    version,
    about = "Single Transferable Vote count with constituency quotas"
)]
struct Opts {
    /// Log filter for diagnostics on stderr. The decision trace always goes
    /// to stdout.
    #[clap(long, short = 'l', global = true, default_value = "info")]
    log_level: String,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count ballots and print the decision trace and results.
    Count(CountArgs),
    /// Summarise a saved trace or JSON report.
    Inspect {
        /// Trace file, or a `.json` report written by `count --output`.
        path: PathBuf,
    },
}

/// The trace goes to stdout as bare lines, so it can be saved and parsed.
fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(trace_layer(std::io::stdout))
        .with(diagnostics_layer(level, std::io::stderr))
        .init();
}

fn main() {
    let opts = Opts::parse();
    init_logging(&opts.log_level);

    let result = match &opts.command {
        Command::Count(args) => count(args),
        Command::Inspect { path } => inspect(path),
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e.to_string().red());
        if let CommandError::Count(CountError::MissingManualChoice { options, .. }) = &e {
            eprintln!(
                "💡 Tied: {}. Re-run with one more --manual index between 0 and {}.",
                options.join(", ").bold(),
                options.len().saturating_sub(1)
            );
        }
        std::process::exit(1);
    }
}
