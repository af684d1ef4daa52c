//! Event data model for the lachesis event DAG.
//!
//! An [`Event`] is a DAG node as handed over by the ingestion collaborator:
//! identity fields plus parent references, already validated and resolved.
//! Once the event passes through [`crate::dag::Dag::ingest`] it becomes a
//! [`SealedEvent`], which pairs the event with the values derived for it at
//! ingestion time: its highest-events vector, its root status, and the frame
//! the root classifier assigned to it. Sealed events never change afterwards.

pub mod ids;
pub mod parser;

pub use ids::{Epoch, EventId, Frame, NodeId, Seq, ValidatorId};
pub use parser::{LineError, ParseError, ParsedLine, parse_line, parse_lines};

use serde::{Deserialize, Serialize};

use crate::root::RootStatus;
use crate::vector::{HighestEvents, Vector};

/// A DAG node referencing zero or more parent events.
///
/// `parents` is empty for a validator's first event. When `seq > 1` the first
/// parent is the self-parent: the same creator's event with `seq - 1`. That
/// shape is the ingestion collaborator's responsibility and is not re-checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    epoch: Epoch,
    seq: Seq,
    frame: Frame,
    creator: ValidatorId,
    node: NodeId,
    id: EventId,
    parents: Vec<EventId>,
}

impl Event {
    /// Assemble an event from already-known identity fields.
    #[must_use]
    pub const fn new(
        epoch: Epoch,
        seq: Seq,
        frame: Frame,
        creator: ValidatorId,
        node: NodeId,
        id: EventId,
        parents: Vec<EventId>,
    ) -> Self {
        Self {
            epoch,
            seq,
            frame,
            creator,
            node,
            id,
            parents,
        }
    }

    /// Assemble an event whose id is the content hash of its identity fields.
    ///
    /// See [`EventId::compute`].
    #[must_use]
    pub fn hashed(
        epoch: Epoch,
        seq: Seq,
        frame: Frame,
        creator: ValidatorId,
        node: NodeId,
        parents: Vec<EventId>,
    ) -> Self {
        let id = EventId::compute(epoch, seq, &creator, &node, &parents);
        Self::new(epoch, seq, frame, creator, node, id, parents)
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.epoch
    }

    #[must_use]
    pub const fn seq(&self) -> Seq {
        self.seq
    }

    /// The frame supplied by the ingestion collaborator.
    ///
    /// The frame assigned by root classification lives on
    /// [`SealedEvent::frame`].
    #[must_use]
    pub const fn frame(&self) -> Frame {
        self.frame
    }

    #[must_use]
    pub const fn creator(&self) -> &ValidatorId {
        &self.creator
    }

    #[must_use]
    pub const fn node(&self) -> &NodeId {
        &self.node
    }

    #[must_use]
    pub const fn id(&self) -> &EventId {
        &self.id
    }

    #[must_use]
    pub fn parents(&self) -> &[EventId] {
        &self.parents
    }

    /// The self-parent, if any.
    ///
    /// Returns `None` when `seq <= 1` or when there are no parents. A
    /// malformed event (`seq > 1` with no parents) yields `None` too, so this
    /// is not a validity check.
    #[must_use]
    pub fn self_parent(&self) -> Option<&EventId> {
        if self.seq <= Seq::FIRST {
            return None;
        }
        self.parents.first()
    }

    /// Returns `true` for a validator's first event.
    #[must_use]
    pub fn is_first(&self) -> bool {
        self.seq == Seq::FIRST
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} by {} (epoch={} seq={} parents={})",
            self.id,
            self.creator,
            self.epoch,
            self.seq,
            self.parents.len()
        )
    }
}

// ---------------------------------------------------------------------------
// SealedEvent
// ---------------------------------------------------------------------------

/// An event together with everything derived for it at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEvent {
    event: Event,
    highest: HighestEvents,
    status: RootStatus,
    frame: Frame,
}

impl SealedEvent {
    pub(crate) const fn new(
        event: Event,
        highest: HighestEvents,
        status: RootStatus,
        frame: Frame,
    ) -> Self {
        Self {
            event,
            highest,
            status,
            frame,
        }
    }

    /// The underlying event.
    #[must_use]
    pub const fn event(&self) -> &Event {
        &self.event
    }

    #[must_use]
    pub const fn id(&self) -> &EventId {
        self.event.id()
    }

    #[must_use]
    pub const fn creator(&self) -> &ValidatorId {
        self.event.creator()
    }

    #[must_use]
    pub const fn seq(&self) -> Seq {
        self.event.seq()
    }

    #[must_use]
    pub const fn epoch(&self) -> Epoch {
        self.event.epoch()
    }

    #[must_use]
    pub fn parents(&self) -> &[EventId] {
        self.event.parents()
    }

    /// The highest event observed per validator through this event's
    /// causal history, as sealed at ingestion.
    #[must_use]
    pub const fn highest_events(&self) -> &HighestEvents {
        &self.highest
    }

    /// Shorthand for `highest_events().get(validator)`.
    #[must_use]
    pub fn vector(&self, validator: &ValidatorId) -> Option<&Vector> {
        self.highest.get(validator)
    }

    #[must_use]
    pub const fn status(&self) -> RootStatus {
        self.status
    }

    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.status.is_root()
    }

    /// The frame assigned by root classification.
    #[must_use]
    pub const fn frame(&self) -> Frame {
        self.frame
    }

    /// Returns `true` if this event's own creator is flagged as forked in
    /// its vector.
    #[must_use]
    pub fn creator_is_forked(&self) -> bool {
        self.highest
            .get(self.event.creator())
            .is_some_and(|v| v.is_fork)
    }
}
