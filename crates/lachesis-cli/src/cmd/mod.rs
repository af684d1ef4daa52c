pub mod ingest;
pub mod roots;

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use lachesis_core::{ConsensusConfig, Dag, HighestEvents, load_config, parse_lines};
use tracing::info;

/// Arguments shared by every command that replays an event log.
#[derive(Args, Debug)]
pub struct InputArgs {
    /// JSON-lines event log, one event per line, parents first.
    pub file: PathBuf,

    /// Consensus config (TOML). Without one, every creator in the log
    /// weighs 1 and missing parents are skipped.
    #[arg(long, short)]
    pub config: Option<PathBuf>,
}

/// Load the config, parse the log and seal every event in file order.
///
/// When the config lists no validators, every creator seen in the log is
/// registered at the config's default weight.
pub fn replay(args: &InputArgs) -> anyhow::Result<Dag> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ConsensusConfig::default(),
    };

    let raw = std::fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read event log {}", args.file.display()))?;
    let events = parse_lines(&raw)
        .with_context(|| format!("Failed to parse event log {}", args.file.display()))?;

    if config.validators.is_empty() {
        let added = config.register_missing(events.iter().map(|(_, event)| event.creator()));
        info!(validators = added, "registered creators from event log");
    }

    let mut dag = Dag::from_config(&config);
    for (line, event) in events {
        dag.ingest(event)
            .with_context(|| format!("{}:{line}: failed to seal event", args.file.display()))?;
    }
    info!(
        events = dag.len(),
        forked = dag.index().forked_validators().len(),
        "event log replayed"
    );
    Ok(dag)
}

/// Compact one-line rendering of a vector: `alice:3,bob:2!` where `!` marks
/// a validator flagged as forked.
pub fn format_vector(highest: &HighestEvents) -> String {
    highest
        .iter()
        .map(|(validator, vector)| {
            let mark = if vector.is_fork { "!" } else { "" };
            format!("{validator}:{}{mark}", vector.seq)
        })
        .collect::<Vec<_>>()
        .join(",")
}
