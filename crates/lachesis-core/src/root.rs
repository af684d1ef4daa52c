//! Root classification.
//!
//! Every validator's first event is a root of frame 1. A later event is a
//! root when it is forkless-caused by a stake quorum of the roots of the
//! frame its self-parent belongs to. Such a root opens the next frame;
//! a non-root stays in its self-parent's frame.
//!
//! Reachability uses the highest-events vector instead of a graph walk: a
//! validator's honest events form a chain, so a root `r` by validator `w` is
//! in an event's causal past iff the event observes `w` at `seq >= r.seq`.
//! Validators flagged as forked in the event's vector are excluded, since
//! their chain is no longer a chain.
//!
//! Weights and the quorum threshold come from an injected [`ValidatorSet`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dag::EventIndex;
use crate::event::{Event, Frame, SealedEvent, ValidatorId};
use crate::vector::HighestEvents;

// ---------------------------------------------------------------------------
// RootStatus
// ---------------------------------------------------------------------------

/// Terminal root state of a sealed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootStatus {
    NotRoot,
    Root,
}

impl RootStatus {
    #[must_use]
    pub const fn is_root(self) -> bool {
        matches!(self, Self::Root)
    }
}

/// Outcome of classifying one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub status: RootStatus,
    /// The frame the event belongs to.
    pub frame: Frame,
}

// ---------------------------------------------------------------------------
// ValidatorSet
// ---------------------------------------------------------------------------

/// Stake table and quorum threshold supplied by the protocol.
///
/// Validators missing from the table weigh nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSet {
    weights: BTreeMap<ValidatorId, u64>,
    quorum: Option<u64>,
}

impl ValidatorSet {
    /// A set with the given weights and the default threshold.
    #[must_use]
    pub fn new(weights: impl IntoIterator<Item = (ValidatorId, u64)>) -> Self {
        Self {
            weights: weights.into_iter().collect(),
            quorum: None,
        }
    }

    /// A set where every listed validator carries `weight`.
    #[must_use]
    pub fn uniform(validators: impl IntoIterator<Item = ValidatorId>, weight: u64) -> Self {
        Self::new(validators.into_iter().map(|v| (v, weight)))
    }

    /// Override the quorum threshold.
    #[must_use]
    pub fn with_quorum(mut self, quorum: u64) -> Self {
        self.quorum = Some(quorum);
        self
    }

    /// Add or replace one validator's weight.
    pub fn insert(&mut self, validator: ValidatorId, weight: u64) {
        self.weights.insert(validator, weight);
    }

    #[must_use]
    pub fn weight(&self, validator: &ValidatorId) -> u64 {
        self.weights.get(validator).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn contains(&self, validator: &ValidatorId) -> bool {
        self.weights.contains_key(validator)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ValidatorId, u64)> {
        self.weights.iter().map(|(v, w)| (v, *w))
    }

    /// Sum of all weights, widened so that no table of `u64` stakes overflows.
    #[must_use]
    pub fn total_weight(&self) -> u128 {
        self.weights.values().map(|w| u128::from(*w)).sum()
    }

    /// Stake needed for a quorum.
    ///
    /// The explicit override if set, else `2 * total / 3 + 1`: strictly more
    /// than two thirds of the total stake.
    #[must_use]
    pub fn quorum(&self) -> u128 {
        self.quorum
            .map_or_else(|| self.total_weight() * 2 / 3 + 1, u128::from)
    }

    /// Returns `true` if `weight` meets the threshold. Exactly at quorum counts.
    #[must_use]
    pub fn is_quorum(&self, weight: u128) -> bool {
        weight >= self.quorum()
    }

    /// Combined stake of a set of distinct validators.
    #[must_use]
    pub fn weight_of<'v>(&self, validators: impl IntoIterator<Item = &'v ValidatorId>) -> u128 {
        validators
            .into_iter()
            .map(|v| u128::from(self.weight(v)))
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Forkless cause
// ---------------------------------------------------------------------------

/// Returns `true` if an event with vector `highest` is forkless-caused by
/// `root`: it observes `root`'s creator at or beyond `root`'s seq, and that
/// creator is not flagged as forked.
#[must_use]
pub fn forkless_cause(highest: &HighestEvents, root: &SealedEvent) -> bool {
    highest
        .get(root.creator())
        .is_some_and(|v| !v.is_fork && v.seq >= root.seq())
}

// ---------------------------------------------------------------------------
// RootClassifier
// ---------------------------------------------------------------------------

/// Classifies freshly aggregated events as roots.
#[derive(Debug, Clone, Copy)]
pub struct RootClassifier<'a> {
    validators: &'a ValidatorSet,
}

impl<'a> RootClassifier<'a> {
    #[must_use]
    pub const fn new(validators: &'a ValidatorSet) -> Self {
        Self { validators }
    }

    /// The frame whose roots `event` must be forkless-caused by.
    ///
    /// The self-parent's assigned frame, or the event's supplied frame when
    /// the self-parent is unknown.
    #[must_use]
    pub fn previous_frame(event: &Event, index: &EventIndex) -> Frame {
        event
            .self_parent()
            .and_then(|id| index.get(id))
            .map_or_else(|| event.frame(), SealedEvent::frame)
    }

    /// Stake of the distinct validators whose roots in `roots` forkless-cause
    /// an event with vector `highest`.
    #[must_use]
    pub fn forkless_cause_weight<'r>(
        &self,
        highest: &HighestEvents,
        roots: impl IntoIterator<Item = &'r SealedEvent>,
    ) -> u128 {
        let causing: BTreeSet<&ValidatorId> = roots
            .into_iter()
            .filter(|root| forkless_cause(highest, root))
            .map(SealedEvent::creator)
            .collect();
        self.validators.weight_of(causing)
    }

    /// Classify `event`, whose vector `highest` has been aggregated and
    /// fork-checked against `index`.
    #[must_use]
    pub fn classify(
        &self,
        event: &Event,
        highest: &HighestEvents,
        index: &EventIndex,
    ) -> Classification {
        if event.is_first() {
            return Classification {
                status: RootStatus::Root,
                frame: Frame::FIRST,
            };
        }

        let previous = Self::previous_frame(event, index);
        let not_root = Classification {
            status: RootStatus::NotRoot,
            frame: previous,
        };

        if highest.get(event.creator()).is_some_and(|v| v.is_fork) {
            debug!(event = %event.id(), creator = %event.creator(), "forked creator cannot produce roots");
            return not_root;
        }

        let weight = self.forkless_cause_weight(highest, index.roots_of(event.epoch(), previous));
        if !self.validators.is_quorum(weight) {
            return not_root;
        }

        let frame = previous.next();
        info!(
            event = %event.id(),
            creator = %event.creator(),
            %frame,
            weight,
            quorum = self.validators.quorum(),
            "root promoted"
        );
        Classification {
            status: RootStatus::Root,
            frame,
        }
    }
}
