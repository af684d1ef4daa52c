//! In-memory index of sealed events.
//!
//! The [`EventIndex`] resolves parents by direct id lookup and keeps the
//! secondary indexes the aggregator, fork detector and root classifier read:
//!
//! - root sets per `(epoch, frame)`,
//! - per-validator `(epoch, seq)` slots, used to spot equivocation without
//!   scanning every known event,
//! - child links, for descendant traversal.
//!
//! Events are only ever added; pruning is the caller's business.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use tracing::warn;

use crate::event::{Epoch, EventId, Frame, SealedEvent, Seq, ValidatorId};

type Slot = (ValidatorId, Epoch, Seq);

/// Sealed events keyed by id, plus secondary indexes.
#[derive(Debug, Clone, Default)]
pub struct EventIndex {
    events: HashMap<EventId, SealedEvent>,
    /// Ids in ingestion order, which is a topological order.
    order: Vec<EventId>,
    children: HashMap<EventId, Vec<EventId>>,
    roots: BTreeMap<(Epoch, Frame), Vec<EventId>>,
    slots: HashMap<Slot, Vec<EventId>>,
    equivocations: HashMap<ValidatorId, BTreeSet<(Epoch, Seq)>>,
}

impl EventIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty index with room for `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: HashMap::with_capacity(capacity),
            order: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &EventId) -> Option<&SealedEvent> {
        self.events.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &EventId) -> bool {
        self.events.contains_key(id)
    }

    /// Sealed events in ingestion order.
    pub fn iter(&self) -> impl Iterator<Item = &SealedEvent> {
        self.order.iter().filter_map(|id| self.events.get(id))
    }

    /// Add a sealed event and update the secondary indexes.
    ///
    /// Returns `false` without touching anything if the id is already known.
    pub(crate) fn insert(&mut self, sealed: SealedEvent) -> bool {
        let id = sealed.id().clone();
        if self.events.contains_key(&id) {
            return false;
        }

        for parent in sealed.parents() {
            self.children
                .entry(parent.clone())
                .or_default()
                .push(id.clone());
        }

        if sealed.is_root() {
            self.roots
                .entry((sealed.epoch(), sealed.frame()))
                .or_default()
                .push(id.clone());
        }

        let slot = (sealed.creator().clone(), sealed.epoch(), sealed.seq());
        let occupants = self.slots.entry(slot).or_default();
        occupants.push(id.clone());
        if occupants.len() > 1 {
            warn!(
                creator = %sealed.creator(),
                epoch = %sealed.epoch(),
                seq = %sealed.seq(),
                events = occupants.len(),
                "equivocation recorded"
            );
            self.equivocations
                .entry(sealed.creator().clone())
                .or_default()
                .insert((sealed.epoch(), sealed.seq()));
        }

        self.order.push(id.clone());
        self.events.insert(id, sealed);
        true
    }

    // -----------------------------------------------------------------------
    // Equivocation slots
    // -----------------------------------------------------------------------

    /// Returns `true` if a known event other than `id` was created by
    /// `creator` at `(epoch, seq)`.
    #[must_use]
    pub fn has_slot_conflict(
        &self,
        creator: &ValidatorId,
        epoch: Epoch,
        seq: Seq,
        id: &EventId,
    ) -> bool {
        self.slots
            .get(&(creator.clone(), epoch, seq))
            .is_some_and(|occupants| occupants.iter().any(|other| other != id))
    }

    /// Returns `true` if `validator` is known to have equivocated in `epoch`
    /// at any seq up to and including `seq`.
    #[must_use]
    pub fn has_equivocated(&self, validator: &ValidatorId, epoch: Epoch, seq: Seq) -> bool {
        self.equivocations.get(validator).is_some_and(|slots| {
            slots
                .range((epoch, Seq(0))..=(epoch, seq))
                .next()
                .is_some()
        })
    }

    /// Every event occupying `creator`'s `(epoch, seq)` slot.
    #[must_use]
    pub fn slot(&self, creator: &ValidatorId, epoch: Epoch, seq: Seq) -> &[EventId] {
        self.slots
            .get(&(creator.clone(), epoch, seq))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Validators with at least one recorded equivocation.
    #[must_use]
    pub fn forked_validators(&self) -> BTreeSet<&ValidatorId> {
        self.equivocations.keys().collect()
    }

    // -----------------------------------------------------------------------
    // Root sets
    // -----------------------------------------------------------------------

    /// Roots assigned to `(epoch, frame)`, in ingestion order.
    pub fn roots_of(&self, epoch: Epoch, frame: Frame) -> impl Iterator<Item = &SealedEvent> {
        self.roots
            .get(&(epoch, frame))
            .into_iter()
            .flatten()
            .filter_map(|id| self.events.get(id))
    }

    /// Root ids grouped by `(epoch, frame)`, in ascending order.
    pub fn root_sets(&self) -> impl Iterator<Item = ((Epoch, Frame), &[EventId])> {
        self.roots.iter().map(|(key, ids)| (*key, ids.as_slice()))
    }

    /// The highest frame holding a root in `epoch`.
    #[must_use]
    pub fn last_frame(&self, epoch: Epoch) -> Option<Frame> {
        self.roots
            .range((epoch, Frame(0))..=(epoch, Frame(u64::MAX)))
            .next_back()
            .map(|((_, frame), _)| *frame)
    }

    // -----------------------------------------------------------------------
    // Traversal
    // -----------------------------------------------------------------------

    /// All known ancestors of `id` (transitive parents), excluding `id`.
    ///
    /// Parents missing from the index are included but not expanded.
    #[must_use]
    pub fn ancestors(&self, id: &EventId) -> HashSet<EventId> {
        let start = self
            .events
            .get(id)
            .map(|sealed| sealed.parents().to_vec())
            .unwrap_or_default();
        Self::walk(start, |current| {
            self.events
                .get(current)
                .map(|sealed| sealed.parents().to_vec())
                .unwrap_or_default()
        })
    }

    /// All known descendants of `id` (transitive children), excluding `id`.
    #[must_use]
    pub fn descendants(&self, id: &EventId) -> HashSet<EventId> {
        let next = |current: &EventId| self.children.get(current).cloned().unwrap_or_default();
        Self::walk(next(id), next)
    }

    /// Returns `true` if `a` is a strict causal ancestor of `b`.
    #[must_use]
    pub fn is_ancestor(&self, a: &EventId, b: &EventId) -> bool {
        a != b && self.ancestors(b).contains(a)
    }

    fn walk<F>(start: Vec<EventId>, mut next: F) -> HashSet<EventId>
    where
        F: FnMut(&EventId) -> Vec<EventId>,
    {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::new();
        for id in start {
            if visited.insert(id.clone()) {
                queue.push_back(id);
            }
        }

        while let Some(current) = queue.pop_front() {
            for id in next(&current) {
                if visited.insert(id.clone()) {
                    queue.push_back(id);
                }
            }
        }

        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Event, NodeId};
    use crate::root::RootStatus;
    use crate::vector::HighestEvents;

    fn sealed(id: &str, creator: &str, seq: u64, parents: &[&str], frame: u64, root: bool) -> SealedEvent {
        let event = Event::new(
            Epoch(1),
            Seq(seq),
            Frame(frame),
            ValidatorId::new(creator),
            NodeId::new(creator),
            EventId::new(id),
            parents.iter().map(|p| EventId::new(*p)).collect(),
        );
        let status = if root { RootStatus::Root } else { RootStatus::NotRoot };
        SealedEvent::new(event, HighestEvents::new(), status, Frame(frame))
    }

    fn id(raw: &str) -> EventId {
        EventId::new(raw)
    }

    #[test]
    fn empty_index() {
        let index = EventIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.len(), 0);
        assert_eq!(index.iter().count(), 0);
        assert!(index.last_frame(Epoch(1)).is_none());
    }

    #[test]
    fn duplicate_insert_is_noop() {
        let mut index = EventIndex::new();
        assert!(index.insert(sealed("a1", "a", 1, &[], 1, true)));
        assert!(!index.insert(sealed("a1", "a", 1, &[], 1, true)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.roots_of(Epoch(1), Frame(1)).count(), 1);
    }

    #[test]
    fn iteration_follows_ingestion_order() {
        let mut index = EventIndex::with_capacity(3);
        index.insert(sealed("b1", "b", 1, &[], 1, true));
        index.insert(sealed("a1", "a", 1, &[], 1, true));
        index.insert(sealed("a2", "a", 2, &["a1", "b1"], 1, false));
        let ids: Vec<_> = index.iter().map(|s| s.id().as_str()).collect();
        assert_eq!(ids, vec!["b1", "a1", "a2"]);
    }

    #[test]
    fn root_sets_group_by_frame() {
        let mut index = EventIndex::new();
        index.insert(sealed("a1", "a", 1, &[], 1, true));
        index.insert(sealed("b1", "b", 1, &[], 1, true));
        index.insert(sealed("a2", "a", 2, &["a1", "b1"], 2, true));
        index.insert(sealed("b2", "b", 2, &["b1"], 1, false));

        let frame1: Vec<_> = index.roots_of(Epoch(1), Frame(1)).map(|s| s.id().clone()).collect();
        assert_eq!(frame1, vec![id("a1"), id("b1")]);
        assert_eq!(index.roots_of(Epoch(1), Frame(2)).count(), 1);
        assert_eq!(index.roots_of(Epoch(2), Frame(1)).count(), 0);
        assert_eq!(index.last_frame(Epoch(1)), Some(Frame(2)));
        assert_eq!(index.root_sets().count(), 2);
    }

    #[test]
    fn slot_conflicts_record_equivocation() {
        let mut index = EventIndex::new();
        let a = ValidatorId::new("a");
        index.insert(sealed("a1", "a", 1, &[], 1, true));
        index.insert(sealed("a2", "a", 2, &["a1"], 1, false));
        assert!(!index.has_slot_conflict(&a, Epoch(1), Seq(2), &id("a2")));
        assert!(index.has_slot_conflict(&a, Epoch(1), Seq(2), &id("a2x")));
        assert!(!index.has_equivocated(&a, Epoch(1), Seq(5)));

        index.insert(sealed("a2x", "a", 2, &["a1"], 1, false));
        assert_eq!(index.slot(&a, Epoch(1), Seq(2)).len(), 2);
        assert!(index.has_equivocated(&a, Epoch(1), Seq(2)));
        assert!(index.has_equivocated(&a, Epoch(1), Seq(3)));
        assert!(!index.has_equivocated(&a, Epoch(1), Seq(1)));
        assert!(!index.has_equivocated(&a, Epoch(2), Seq(3)));
        assert_eq!(index.forked_validators().into_iter().collect::<Vec<_>>(), vec![&a]);
    }

    #[test]
    fn ancestry_walks() {
        //   a1   b1
        //    \  /  \
        //     a2    b2
        //      \   /
        //       a3
        let mut index = EventIndex::new();
        index.insert(sealed("a1", "a", 1, &[], 1, true));
        index.insert(sealed("b1", "b", 1, &[], 1, true));
        index.insert(sealed("a2", "a", 2, &["a1", "b1"], 1, false));
        index.insert(sealed("b2", "b", 2, &["b1"], 1, false));
        index.insert(sealed("a3", "a", 3, &["a2", "b2"], 1, false));

        let ancestors = index.ancestors(&id("a3"));
        assert_eq!(ancestors.len(), 4);
        assert!(index.ancestors(&id("a1")).is_empty());

        let descendants = index.descendants(&id("b1"));
        assert_eq!(
            descendants,
            [id("a2"), id("b2"), id("a3")].into_iter().collect::<HashSet<_>>()
        );

        assert!(index.is_ancestor(&id("b1"), &id("a3")));
        assert!(!index.is_ancestor(&id("a3"), &id("b1")));
        assert!(!index.is_ancestor(&id("a3"), &id("a3")));
        assert!(!index.is_ancestor(&id("a2"), &id("b2")));
    }

    #[test]
    fn unknown_parent_is_listed_but_not_expanded() {
        let mut index = EventIndex::new();
        index.insert(sealed("a2", "a", 2, &["ghost"], 1, false));
        assert_eq!(
            index.ancestors(&id("a2")),
            [id("ghost")].into_iter().collect::<HashSet<_>>()
        );
    }
}
