#![deny(unsafe_code)]

mod commands;
mod exit_code;
mod input;
mod output;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use polystat_core::DataError;

use crate::commands::{config, render};
use crate::input::InputError;

/// Render polystat panel records from the command line
#[derive(Parser)]
#[command(name = "polystat")]
#[command(author, version)]
#[command(propagate_version = true)]
#[command(after_help = "EXAMPLES:
    # Render a panel from saved query results
    polystat render --config panel.json --data series.json

    # Read series from stdin and emit JSON
    curl -s $QUERY_URL | polystat render --config panel.json --data - --json

    # Show the panel record after defaults and validation
    polystat config --config panel.json
")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tile pipeline over series data
    Render(render::Args),

    /// Show the validated panel record
    Config(config::Args),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(e) => {
            let code = categorize_error(&e);

            let args: Vec<String> = std::env::args().collect();
            let is_quiet = args.iter().any(|a| a == "-q" || a == "--quiet");
            if !is_quiet {
                eprintln!("Error: {e:#}");
            }

            ExitCode::from(code)
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    if !cli.quiet {
        setup_tracing(cli.verbose);
    }

    match cli.command {
        Commands::Render(args) => render::execute(&args, cli.quiet),
        Commands::Config(args) => config::execute(&args),
    }
}

fn setup_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(io::stderr)
        .init();
}

/// Maps an error chain to an exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if let Some(input_err) = cause.downcast_ref::<InputError>() {
            return match input_err {
                InputError::Read { source, .. } if source.kind() == io::ErrorKind::NotFound => exit_code::NOT_FOUND,
                InputError::Read { .. } => exit_code::GENERAL_ERROR,
                InputError::Config { .. } => exit_code::CONFIG_INVALID,
                InputError::Data { .. } => exit_code::DATA_INVALID,
            };
        }

        if cause.downcast_ref::<DataError>().is_some() {
            return exit_code::DATA_INVALID;
        }
    }

    exit_code::GENERAL_ERROR
}
