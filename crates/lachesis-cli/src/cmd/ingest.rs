//! `lachesis ingest`: seal an event log and print each event's derived state.

use std::io::{self, Write};

use clap::Args;
use lachesis_core::{
    Dag, Epoch, EventId, Frame, HighestEvents, RootStatus, SealedEvent, Seq, ValidatorId,
};
use serde::Serialize;

use super::{InputArgs, format_vector, replay};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
pub struct EventRecord<'a> {
    pub id: &'a EventId,
    pub creator: &'a ValidatorId,
    pub epoch: Epoch,
    pub seq: Seq,
    pub frame: Frame,
    pub status: RootStatus,
    pub parents: &'a [EventId],
    pub highest_events: &'a HighestEvents,
}

impl<'a> From<&'a SealedEvent> for EventRecord<'a> {
    fn from(sealed: &'a SealedEvent) -> Self {
        Self {
            id: sealed.id(),
            creator: sealed.creator(),
            epoch: sealed.epoch(),
            seq: sealed.seq(),
            frame: sealed.frame(),
            status: sealed.status(),
            parents: sealed.parents(),
            highest_events: sealed.highest_events(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct IngestReport<'a> {
    pub events: Vec<EventRecord<'a>>,
    pub forked: Vec<&'a ValidatorId>,
}

impl<'a> IngestReport<'a> {
    pub fn new(dag: &'a Dag) -> Self {
        Self {
            events: dag.index().iter().map(EventRecord::from).collect(),
            forked: dag.index().forked_validators().into_iter().collect(),
        }
    }
}

const TEXT_HEADERS: &[&str] = &["id", "creator", "epoch", "seq", "frame", "root", "vector"];

fn render_text(report: &IngestReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{}", TEXT_HEADERS.join("  "))?;
    for event in &report.events {
        writeln!(
            w,
            "{}  {}  {}  {}  {}  {}  {}",
            event.id,
            event.creator,
            event.epoch,
            event.seq,
            event.frame,
            if event.status.is_root() { "root" } else { "-" },
            format_vector(event.highest_events)
        )?;
    }
    Ok(())
}

fn render_pretty(report: &IngestReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Sealed events ({})", report.events.len()))?;
    for event in &report.events {
        pretty_kv(w, "id", event.id.as_str())?;
        pretty_kv(w, "creator", event.creator.as_str())?;
        pretty_kv(w, "position", format!("epoch {} seq {}", event.epoch, event.seq))?;
        let root = if event.status.is_root() { "root" } else { "not root" };
        pretty_kv(w, "frame", format!("{} ({root})", event.frame))?;
        pretty_kv(w, "vector", format_vector(event.highest_events))?;
        writeln!(w)?;
    }
    pretty_rule(w)?;
    if report.forked.is_empty() {
        pretty_kv(w, "forked", "none")
    } else {
        let names: Vec<String> = report.forked.iter().map(ToString::to_string).collect();
        pretty_kv(w, "forked", names.join(", "))
    }
}

/// Seal every event in `args.input.file` and print one record per event.
pub fn run_ingest(args: &IngestArgs, output: OutputMode) -> anyhow::Result<()> {
    let dag = replay(&args.input)?;
    let report = IngestReport::new(&dag);
    render_mode(output, &report, render_text, render_pretty)
}
