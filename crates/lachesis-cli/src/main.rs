#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error, resolve_output_mode};
use std::env;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lachesis: event DAG vectors, fork flags and roots",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Shorthand for `--format json`.
    #[arg(long, global = true, hide = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Seal an event log and print every event's vector",
        long_about = "Seal a JSON-lines event log in file order and print each event's \
                      frame, root status and highest-events vector.",
        after_help = "EXAMPLES:\n    # Seal a log with one unit of stake per creator\n    lachesis ingest events.jsonl\n\n    # Use a weighted validator set\n    lachesis ingest events.jsonl --config consensus.toml\n\n    # Emit machine-readable output\n    lachesis ingest events.jsonl --format json"
    )]
    Ingest(cmd::ingest::IngestArgs),

    #[command(
        about = "Seal an event log and print root sets per frame",
        long_about = "Seal a JSON-lines event log and print the roots of every \
                      (epoch, frame) together with the validators known to have forked.",
        after_help = "EXAMPLES:\n    # Show root sets\n    lachesis roots events.jsonl\n\n    # Emit machine-readable output\n    lachesis roots events.jsonl --json"
    )]
    Roots(cmd::roots::RootsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("LACHESIS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "lachesis=debug,info"
        } else {
            "lachesis=info,warn"
        })
    });

    let format = env::var("LACHESIS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = resolve_output_mode(cli.format, cli.json);

    let command_result = match &cli.command {
        Commands::Ingest(args) => cmd::ingest::run_ingest(args, output),
        Commands::Roots(args) => cmd::roots::run_roots(args, output),
    };

    if let Err(err) = command_result {
        render_error(output, &CliError::from(&err))?;
        std::process::exit(1);
    }

    Ok(())
}
