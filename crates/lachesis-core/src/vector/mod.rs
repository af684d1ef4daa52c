//! Highest-events vectors: the per-validator vector clock of an event.
//!
//! For every validator seen anywhere in an event's causal history, the
//! event's [`HighestEvents`] records the highest-`seq` event by that validator
//! and whether the validator is known to have forked.
//!
//! # Sub-modules
//!
//! - this module: [`Vector`], [`HighestEvents`] and the aggregator
//!   ([`compute_highest_events`]), a pointwise max-merge over parents' vectors.
//! - [`fork`]: equivocation flags layered on top of the aggregated vector.
//!
//! Both are pure functions of `(event, index)`: recomputing from an unchanged
//! index yields an identical vector.

pub mod fork;

pub use fork::detect_forks;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::MissingParentPolicy;
use crate::dag::EventIndex;
use crate::error::IngestError;
use crate::event::{Event, EventId, SealedEvent, Seq, ValidatorId};

// ---------------------------------------------------------------------------
// Vector
// ---------------------------------------------------------------------------

/// Observation record for one validator inside a [`HighestEvents`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vector {
    /// The highest event by the validator observed in the causal history.
    pub event_id: EventId,
    /// That event's sequence number; the merge comparison key.
    pub seq: Seq,
    /// The validator is known, somewhere in the causal history, to have forked.
    pub is_fork: bool,
}

impl Vector {
    /// An unflagged observation of `event_id` at `seq`.
    #[must_use]
    pub const fn observed(event_id: EventId, seq: Seq) -> Self {
        Self {
            event_id,
            seq,
            is_fork: false,
        }
    }
}

// ---------------------------------------------------------------------------
// HighestEvents
// ---------------------------------------------------------------------------

/// Mapping from validator to its highest observed event.
///
/// Ordered by validator id so iteration, serialization and equality are
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighestEvents {
    entries: BTreeMap<ValidatorId, Vector>,
}

impl HighestEvents {
    /// An empty vector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, validator: &ValidatorId) -> Option<&Vector> {
        self.entries.get(validator)
    }

    #[must_use]
    pub fn contains(&self, validator: &ValidatorId) -> bool {
        self.entries.contains_key(validator)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(validator, vector)` pairs in validator order.
    pub fn iter(&self) -> impl Iterator<Item = (&ValidatorId, &Vector)> {
        self.entries.iter()
    }

    /// Validators flagged as forked.
    pub fn forked(&self) -> impl Iterator<Item = &ValidatorId> {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_fork)
            .map(|(validator, _)| validator)
    }

    /// Overwrite the entry for `validator`.
    pub(crate) fn insert(&mut self, validator: ValidatorId, vector: Vector) {
        self.entries.insert(validator, vector);
    }

    /// Merge one observation into the vector.
    ///
    /// Overwrites the entry's event and seq when `seq` is strictly greater
    /// than the recorded one, or inserts a fresh entry. Equal seqs keep the
    /// first writer. The entry's fork flag is left untouched.
    ///
    /// Returns `true` if the entry changed.
    pub(crate) fn observe(&mut self, validator: &ValidatorId, event_id: &EventId, seq: Seq) -> bool {
        match self.entries.get_mut(validator) {
            Some(current) if seq > current.seq => {
                current.event_id = event_id.clone();
                current.seq = seq;
                true
            }
            Some(_) => false,
            None => {
                self.entries
                    .insert(validator.clone(), Vector::observed(event_id.clone(), seq));
                true
            }
        }
    }

    /// Set the fork flag on an existing entry.
    ///
    /// Returns `true` if the flag was newly set.
    pub(crate) fn flag_fork(&mut self, validator: &ValidatorId) -> bool {
        match self.entries.get_mut(validator) {
            Some(v) if !v.is_fork => {
                v.is_fork = true;
                true
            }
            _ => false,
        }
    }
}

impl<'a> IntoIterator for &'a HighestEvents {
    type Item = (&'a ValidatorId, &'a Vector);
    type IntoIter = std::collections::btree_map::Iter<'a, ValidatorId, Vector>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Resolve an event's parents against the index.
///
/// Unknown parents are skipped under [`MissingParentPolicy::Lenient`] and
/// rejected under [`MissingParentPolicy::Strict`].
///
/// # Errors
///
/// Returns [`IngestError::MissingAncestor`] for the first unknown parent when
/// the policy is strict.
pub fn resolve_parents<'a>(
    event: &Event,
    index: &'a EventIndex,
    policy: MissingParentPolicy,
) -> Result<Vec<&'a SealedEvent>, IngestError> {
    let mut resolved = Vec::with_capacity(event.parents().len());
    for parent_id in event.parents() {
        match index.get(parent_id) {
            Some(parent) => resolved.push(parent),
            None if policy.is_strict() => {
                return Err(IngestError::MissingAncestor {
                    event: event.id().clone(),
                    parent: parent_id.clone(),
                });
            }
            None => {
                debug!(event = %event.id(), parent = %parent_id, "skipping unknown parent");
            }
        }
    }
    Ok(resolved)
}

/// Compute the highest-events vector of `event` from its parents' vectors.
///
/// The event always observes itself under its creator. Then:
///
/// - **First event** (`seq == 1`) or empty index: each known parent is
///   recorded as the observation for its creator, without merging the
///   parent's own vector. A parent by the event's own creator (the tip of a
///   previous epoch) replaces the event itself when its `seq` is higher.
/// - **Otherwise**: each known parent is recorded for its creator, and every
///   entry of the parent's vector is merged in. Merging keeps the strictly
///   greatest `seq` per validator, so the result is the highest event per
///   validator reachable through any ancestry path.
///
/// Fork flags are not set here; see [`detect_forks`].
///
/// # Errors
///
/// Returns [`IngestError::MissingAncestor`] when a parent is unknown and the
/// policy is strict.
pub fn compute_highest_events(
    event: &Event,
    index: &EventIndex,
    policy: MissingParentPolicy,
) -> Result<HighestEvents, IngestError> {
    let parents = resolve_parents(event, index, policy)?;

    let mut highest = HighestEvents::new();
    highest.insert(
        event.creator().clone(),
        Vector::observed(event.id().clone(), event.seq()),
    );

    if event.is_first() || index.is_empty() {
        for parent in parents {
            highest.observe(parent.creator(), parent.id(), parent.seq());
        }
        return Ok(highest);
    }

    for parent in parents {
        highest.observe(parent.creator(), parent.id(), parent.seq());
        for (validator, observed) in parent.highest_events() {
            highest.observe(validator, &observed.event_id, observed.seq);
        }
    }

    Ok(highest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::Dag;
    use crate::event::{Epoch, Frame, NodeId};
    use crate::root::ValidatorSet;

    fn ev(id: &str, creator: &str, seq: u64, parents: &[&str]) -> Event {
        Event::new(
            Epoch(1),
            Seq(seq),
            Frame(1),
            ValidatorId::new(creator),
            NodeId::new(creator),
            EventId::new(id),
            parents.iter().map(|p| EventId::new(*p)).collect(),
        )
    }

    fn dag() -> Dag {
        Dag::new(
            ValidatorSet::uniform(["a", "b", "c"].map(ValidatorId::new), 1),
            MissingParentPolicy::Lenient,
        )
    }

    #[test]
    fn observe_keeps_strictly_greatest() {
        let v = ValidatorId::new("a");
        let mut highest = HighestEvents::new();
        assert!(highest.observe(&v, &EventId::new("a2"), Seq(2)));
        assert!(!highest.observe(&v, &EventId::new("a1"), Seq(1)));
        assert!(!highest.observe(&v, &EventId::new("a2-fork"), Seq(2)));
        assert!(highest.observe(&v, &EventId::new("a3"), Seq(3)));
        assert_eq!(highest.get(&v).unwrap().event_id, EventId::new("a3"));
    }

    #[test]
    fn observe_preserves_fork_flag() {
        let v = ValidatorId::new("a");
        let mut highest = HighestEvents::new();
        highest.observe(&v, &EventId::new("a1"), Seq(1));
        assert!(highest.flag_fork(&v));
        assert!(!highest.flag_fork(&v));
        highest.observe(&v, &EventId::new("a2"), Seq(2));
        assert!(highest.get(&v).unwrap().is_fork);
    }

    #[test]
    fn first_event_observes_only_itself() {
        let index = EventIndex::new();
        let e = ev("a1", "a", 1, &[]);
        let highest = compute_highest_events(&e, &index, MissingParentPolicy::Lenient).unwrap();
        assert_eq!(highest.len(), 1);
        assert_eq!(
            highest.get(&ValidatorId::new("a")),
            Some(&Vector::observed(EventId::new("a1"), Seq(1)))
        );
    }

    #[test]
    fn first_event_with_parents_seeds_parent_creators() {
        let mut dag = dag();
        dag.ingest(ev("b1", "b", 1, &[])).unwrap();
        dag.ingest(ev("b2", "b", 2, &["b1"])).unwrap();

        let e = ev("a1", "a", 1, &["b2"]);
        let highest =
            compute_highest_events(&e, dag.index(), MissingParentPolicy::Lenient).unwrap();
        assert_eq!(highest.get(&ValidatorId::new("b")).unwrap().seq, Seq(2));
        assert_eq!(highest.get(&ValidatorId::new("a")).unwrap().seq, Seq(1));
    }

    #[test]
    fn first_event_citing_own_previous_tip_observes_the_tip() {
        let mut dag = dag();
        dag.ingest(ev("a1", "a", 1, &[])).unwrap();
        dag.ingest(ev("a2", "a", 2, &["a1"])).unwrap();
        dag.ingest(ev("a3", "a", 3, &["a2"])).unwrap();

        let e = Event::new(
            Epoch(2),
            Seq(1),
            Frame(1),
            ValidatorId::new("a"),
            NodeId::new("a"),
            EventId::new("a-e2-1"),
            vec![EventId::new("a3")],
        );
        let highest =
            compute_highest_events(&e, dag.index(), MissingParentPolicy::Strict).unwrap();
        assert_eq!(highest.len(), 1);
        assert_eq!(
            highest.get(&ValidatorId::new("a")),
            Some(&Vector::observed(EventId::new("a3"), Seq(3)))
        );
    }

    #[test]
    fn merge_takes_max_across_parents() {
        let mut dag = dag();
        dag.ingest(ev("a1", "a", 1, &[])).unwrap();
        dag.ingest(ev("c1", "c", 1, &[])).unwrap();
        dag.ingest(ev("c2", "c", 2, &["c1"])).unwrap();
        dag.ingest(ev("c3", "c", 3, &["c2"])).unwrap();
        dag.ingest(ev("b1", "b", 1, &[])).unwrap();
        // b2 sees c3, a2 sees only c1.
        dag.ingest(ev("b2", "b", 2, &["b1", "c3"])).unwrap();
        dag.ingest(ev("a2", "a", 2, &["a1", "c1"])).unwrap();

        // a3 reaches c1 through a2 and c3 through b2.
        let e = ev("a3", "a", 3, &["a2", "b2"]);
        let highest =
            compute_highest_events(&e, dag.index(), MissingParentPolicy::Lenient).unwrap();

        assert_eq!(highest.get(&ValidatorId::new("a")).unwrap().event_id, EventId::new("a3"));
        assert_eq!(highest.get(&ValidatorId::new("b")).unwrap().event_id, EventId::new("b2"));
        assert_eq!(highest.get(&ValidatorId::new("c")).unwrap().event_id, EventId::new("c3"));
    }

    #[test]
    fn direct_parent_does_not_lower_merged_entry() {
        let mut dag = dag();
        dag.ingest(ev("c1", "c", 1, &[])).unwrap();
        dag.ingest(ev("c2", "c", 2, &["c1"])).unwrap();
        dag.ingest(ev("b1", "b", 1, &["c2"])).unwrap();
        dag.ingest(ev("b2", "b", 2, &["b1", "c2"])).unwrap();
        dag.ingest(ev("a1", "a", 1, &[])).unwrap();

        // b2's vector carries c2; the later direct parent c1 must not win.
        let e = ev("a2", "a", 2, &["a1", "b2", "c1"]);
        let highest =
            compute_highest_events(&e, dag.index(), MissingParentPolicy::Lenient).unwrap();
        assert_eq!(highest.get(&ValidatorId::new("c")).unwrap().seq, Seq(2));
    }

    #[test]
    fn lenient_skips_unknown_parent() {
        let mut dag = dag();
        dag.ingest(ev("a1", "a", 1, &[])).unwrap();
        let e = ev("a2", "a", 2, &["a1", "ghost"]);
        let highest =
            compute_highest_events(&e, dag.index(), MissingParentPolicy::Lenient).unwrap();
        assert_eq!(highest.len(), 1);
    }

    #[test]
    fn strict_rejects_unknown_parent() {
        let mut dag = dag();
        dag.ingest(ev("a1", "a", 1, &[])).unwrap();
        let e = ev("a2", "a", 2, &["a1", "ghost"]);
        let err =
            compute_highest_events(&e, dag.index(), MissingParentPolicy::Strict).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MissingAncestor { ref parent, .. } if parent.as_str() == "ghost"
        ));
    }
}
