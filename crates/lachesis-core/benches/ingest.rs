use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use lachesis_core::{
    Dag, Epoch, Event, EventId, Frame, MissingParentPolicy, NodeId, Seq, ValidatorId,
    ValidatorSet,
};

/// `(validators, rounds)` tiers.
const TIERS: &[(usize, u64)] = &[(4, 64), (16, 32), (64, 8)];

/// Fully connected rounds: every event cites its self-parent and every other
/// validator's previous event.
fn rounds(validators: usize, rounds: u64) -> Vec<Event> {
    let names: Vec<ValidatorId> = (0..validators)
        .map(|i| ValidatorId::new(format!("v{i}")))
        .collect();
    let mut previous: Vec<EventId> = Vec::new();
    let mut events = Vec::with_capacity(validators * usize::try_from(rounds).unwrap_or(0));

    for seq in 1..=rounds {
        let mut current = Vec::with_capacity(validators);
        for (i, creator) in names.iter().enumerate() {
            let parents = if previous.is_empty() {
                Vec::new()
            } else {
                let mut parents = vec![previous[i].clone()];
                parents.extend(
                    previous
                        .iter()
                        .enumerate()
                        .filter(|(j, _)| *j != i)
                        .map(|(_, id)| id.clone()),
                );
                parents
            };
            let event = Event::hashed(
                Epoch(1),
                Seq(seq),
                Frame(1),
                creator.clone(),
                NodeId::new(creator.as_str()),
                parents,
            );
            current.push(event.id().clone());
            events.push(event);
        }
        previous = current;
    }
    events
}

fn bench_ingest(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest.rounds");

    for &(validators, depth) in TIERS {
        let events = rounds(validators, depth);
        let set = ValidatorSet::uniform(
            (0..validators).map(|i| ValidatorId::new(format!("v{i}"))),
            1,
        );
        group.throughput(Throughput::Elements(events.len() as u64));

        group.bench_with_input(
            BenchmarkId::new("strict", format!("{validators}x{depth}")),
            &events,
            |b, events| {
                b.iter(|| {
                    let mut dag = Dag::new(set.clone(), MissingParentPolicy::Strict);
                    black_box(dag.ingest_all(events.iter().cloned()))
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_ingest);
criterion_main!(benches);
