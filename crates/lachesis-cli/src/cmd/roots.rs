//! `lachesis roots`: print root sets per `(epoch, frame)` after sealing a log.

use std::collections::BTreeSet;
use std::io::{self, Write};

use clap::Args;
use lachesis_core::{Dag, Epoch, EventId, Frame, ValidatorId};
use serde::Serialize;

use super::{InputArgs, replay};
use crate::output::{OutputMode, pretty_kv, pretty_rule, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct RootsArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Serialize)]
pub struct RootRecord<'a> {
    pub id: &'a EventId,
    pub creator: &'a ValidatorId,
}

#[derive(Debug, Serialize)]
pub struct FrameRoots<'a> {
    pub epoch: Epoch,
    pub frame: Frame,
    pub weight: u128,
    pub roots: Vec<RootRecord<'a>>,
}

#[derive(Debug, Serialize)]
pub struct RootsReport<'a> {
    pub quorum: u128,
    pub frames: Vec<FrameRoots<'a>>,
    pub forked: Vec<&'a ValidatorId>,
}

impl<'a> RootsReport<'a> {
    pub fn new(dag: &'a Dag) -> Self {
        let frames = dag
            .index()
            .root_sets()
            .map(|((epoch, frame), _)| {
                let roots: Vec<RootRecord<'a>> = dag
                    .index()
                    .roots_of(epoch, frame)
                    .map(|root| RootRecord {
                        id: root.id(),
                        creator: root.creator(),
                    })
                    .collect();
                let creators: BTreeSet<&ValidatorId> = roots.iter().map(|r| r.creator).collect();
                let weight = dag.validators().weight_of(creators);
                FrameRoots {
                    epoch,
                    frame,
                    weight,
                    roots,
                }
            })
            .collect();

        Self {
            quorum: dag.validators().quorum(),
            frames,
            forked: dag.index().forked_validators().into_iter().collect(),
        }
    }
}

fn render_text(report: &RootsReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "epoch  frame  weight  roots")?;
    for frame in &report.frames {
        let ids: Vec<&str> = frame.roots.iter().map(|r| r.id.as_str()).collect();
        writeln!(
            w,
            "{}  {}  {}  {}",
            frame.epoch,
            frame.frame,
            frame.weight,
            ids.join(",")
        )?;
    }
    Ok(())
}

fn render_pretty(report: &RootsReport<'_>, w: &mut dyn Write) -> io::Result<()> {
    pretty_section(w, &format!("Root sets (quorum {})", report.quorum))?;
    for frame in &report.frames {
        pretty_kv(
            w,
            "frame",
            format!("epoch {} frame {} (weight {})", frame.epoch, frame.frame, frame.weight),
        )?;
        for root in &frame.roots {
            writeln!(w, "  {} by {}", root.id, root.creator)?;
        }
    }
    pretty_rule(w)?;
    if report.forked.is_empty() {
        pretty_kv(w, "forked", "none")
    } else {
        let names: Vec<String> = report.forked.iter().map(ToString::to_string).collect();
        pretty_kv(w, "forked", names.join(", "))
    }
}

/// Seal every event in `args.input.file` and print the resulting root sets.
pub fn run_roots(args: &RootsArgs, output: OutputMode) -> anyhow::Result<()> {
    let dag = replay(&args.input)?;
    let report = RootsReport::new(&dag);
    render_mode(output, &report, render_text, render_pretty)
}
