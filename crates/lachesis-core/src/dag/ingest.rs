//! The ingestion pipeline: read parents, aggregate, detect forks, classify,
//! insert.
//!
//! [`Dag::ingest`] is the single entry point through which events become
//! [`SealedEvent`]s. Events must arrive parents-first; a parent that has not
//! been ingested yet is handled by the configured [`MissingParentPolicy`].

use tracing::{debug, warn};

use crate::config::{ConsensusConfig, MissingParentPolicy};
use crate::error::IngestError;
use crate::event::{Event, EventId, SealedEvent};
use crate::root::{Classification, RootClassifier, ValidatorSet};
use crate::vector::{HighestEvents, compute_highest_events, detect_forks};

use super::EventIndex;

/// An event index together with the injected consensus parameters.
#[derive(Debug, Clone)]
pub struct Dag {
    index: EventIndex,
    validators: ValidatorSet,
    policy: MissingParentPolicy,
}

impl Dag {
    /// Create an empty DAG.
    #[must_use]
    pub fn new(validators: ValidatorSet, policy: MissingParentPolicy) -> Self {
        Self {
            index: EventIndex::new(),
            validators,
            policy,
        }
    }

    /// Create an empty DAG from loaded configuration.
    #[must_use]
    pub fn from_config(config: &ConsensusConfig) -> Self {
        Self::new(config.validator_set(), config.missing_parent)
    }

    #[must_use]
    pub const fn index(&self) -> &EventIndex {
        &self.index
    }

    #[must_use]
    pub const fn validators(&self) -> &ValidatorSet {
        &self.validators
    }

    #[must_use]
    pub const fn policy(&self) -> MissingParentPolicy {
        self.policy
    }

    #[must_use]
    pub fn get(&self, id: &EventId) -> Option<&SealedEvent> {
        self.index.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Seal `event` and add it to the index.
    ///
    /// An id that is already sealed is a no-op returning the existing event.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::MissingAncestor`] when a parent is unknown and
    /// the policy is [`MissingParentPolicy::Strict`]. Nothing is inserted in
    /// that case.
    pub fn ingest(&mut self, event: Event) -> Result<&SealedEvent, IngestError> {
        if self.index.contains(event.id()) {
            debug!(event = %event.id(), "event already sealed; skipping");
            return self.sealed(event.id());
        }

        let sealed = self.seal(event)?;
        let id = sealed.id().clone();
        self.index.insert(sealed);
        self.sealed(&id)
    }

    /// Seal every event in order, stopping at the first error.
    ///
    /// Returns the number of events newly sealed.
    ///
    /// # Errors
    ///
    /// Same as [`Dag::ingest`].
    pub fn ingest_all(&mut self, events: impl IntoIterator<Item = Event>) -> Result<usize, IngestError> {
        let before = self.len();
        for event in events {
            self.ingest(event)?;
        }
        Ok(self.len() - before)
    }

    /// Derive the sealed form of `event` against the current index without
    /// inserting it.
    ///
    /// # Errors
    ///
    /// Same as [`Dag::ingest`].
    pub fn seal(&self, event: Event) -> Result<SealedEvent, IngestError> {
        let highest = self.highest_events_for(&event)?;
        let Classification { status, frame } =
            RootClassifier::new(&self.validators).classify(&event, &highest, &self.index);
        Ok(SealedEvent::new(event, highest, status, frame))
    }

    /// Re-derive the vector of an already sealed event from the current
    /// index.
    ///
    /// Returns `None` for unknown ids. With no conflicting event ingested
    /// since, the result equals the sealed vector.
    ///
    /// # Errors
    ///
    /// Same as [`Dag::ingest`].
    pub fn recompute(&self, id: &EventId) -> Option<Result<HighestEvents, IngestError>> {
        let sealed = self.index.get(id)?;
        Some(self.highest_events_for(sealed.event()))
    }

    fn highest_events_for(&self, event: &Event) -> Result<HighestEvents, IngestError> {
        let mut highest = compute_highest_events(event, &self.index, self.policy)?;
        let flagged = detect_forks(event, &self.index, &mut highest);
        if !flagged.is_empty() {
            warn!(
                event = %event.id(),
                creator = %event.creator(),
                forked = ?flagged,
                "fork flags raised"
            );
        }
        Ok(highest)
    }

    fn sealed(&self, id: &EventId) -> Result<&SealedEvent, IngestError> {
        self.index
            .get(id)
            .ok_or_else(|| IngestError::Internal(format!("sealed event {id} vanished from index")))
    }
}
