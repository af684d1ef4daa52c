//! Equivocation (fork) flags on top of an aggregated highest-events vector.
//!
//! A validator forks when it produces two distinct events with the same
//! `(epoch, seq)`. Detection never fails ingestion; it only sets
//! [`Vector::is_fork`](super::Vector::is_fork) so the consensus layer can act
//! on it. Flags only ever go from `false` to `true`.

use std::collections::BTreeSet;

use crate::dag::EventIndex;
use crate::event::{Event, ValidatorId};

use super::HighestEvents;

/// Flag forked validators in `highest`, the freshly aggregated vector of
/// `event`.
///
/// Runs three passes:
///
/// 1. **Direct**: another known event by `event`'s creator shares its
///    `(epoch, seq)`, so the creator is flagged.
/// 2. **Inheritance**: every fork flag carried by a known parent's vector is
///    carried into `highest`. An entry the aggregator did not merge (a first
///    event citing parents) is copied over from the parent.
/// 3. **Observed slot**: an observed event sits at or above a sequence
///    number where the index already holds an equivocation by the same
///    validator in the same epoch.
///
/// Returns the validators newly flagged by this call, in validator order.
pub fn detect_forks(
    event: &Event,
    index: &EventIndex,
    highest: &mut HighestEvents,
) -> Vec<ValidatorId> {
    let mut flagged = BTreeSet::new();

    if index.has_slot_conflict(event.creator(), event.epoch(), event.seq(), event.id())
        && highest.flag_fork(event.creator())
    {
        flagged.insert(event.creator().clone());
    }

    for parent in event.parents().iter().filter_map(|id| index.get(id)) {
        for (validator, inherited) in parent.highest_events().iter().filter(|(_, v)| v.is_fork) {
            if !highest.contains(validator) {
                highest.insert(validator.clone(), inherited.clone());
                flagged.insert(validator.clone());
            } else if highest.flag_fork(validator) {
                flagged.insert(validator.clone());
            }
        }
    }

    let observed_slots: Vec<_> = highest
        .iter()
        .filter(|(_, v)| !v.is_fork)
        .filter_map(|(validator, v)| {
            let epoch = if v.event_id == *event.id() {
                event.epoch()
            } else {
                index.get(&v.event_id)?.epoch()
            };
            index
                .has_equivocated(validator, epoch, v.seq)
                .then(|| validator.clone())
        })
        .collect();
    for validator in observed_slots {
        if highest.flag_fork(&validator) {
            flagged.insert(validator);
        }
    }

    flagged.into_iter().collect()
}
