//! Identifier newtypes for validators, nodes, events and protocol counters.
//!
//! String identifiers are serde-transparent so they read naturally in the
//! JSON-lines ingestion format. Counters are `u64` newtypes; the protocol
//! starts every counter at 1.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// String identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier string.
            #[must_use]
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            /// Borrow the raw identifier string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(
    /// A consensus participant.
    ValidatorId
);

string_id!(
    /// The physical or process owner that produced an event.
    ///
    /// Kept separate from [`ValidatorId`] so one node can host several
    /// validators, and so a validator running on two nodes shows up in
    /// diagnostics.
    NodeId
);

string_id!(
    /// Content-derived event identity.
    ///
    /// Ids produced by [`EventId::compute`] use the `blake3:<hex>` format.
    /// Ids supplied by an ingestion collaborator are taken as-is.
    EventId
);

impl EventId {
    /// Compute the content hash of an event's identity fields.
    ///
    /// The hash input is the tab-joined `epoch`, `seq`, `creator`, `node`
    /// and comma-joined parent ids, terminated by a newline.
    ///
    /// Parents are hashed in the order given: the first parent is the
    /// self-parent, so reordering parents yields a different event.
    #[must_use]
    pub fn compute(
        epoch: Epoch,
        seq: Seq,
        creator: &ValidatorId,
        node: &NodeId,
        parents: &[Self],
    ) -> Self {
        let parents = parents
            .iter()
            .map(Self::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let hash_input = format!("{epoch}\t{seq}\t{creator}\t{node}\t{parents}\n");
        let hash = blake3::hash(hash_input.as_bytes());
        Self(format!("blake3:{hash}"))
    }
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

macro_rules! counter {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// The first value of this counter.
            pub const FIRST: Self = Self(1);

            /// Raw counter value.
            #[must_use]
            pub const fn get(self) -> u64 {
                self.0
            }

            /// The following value, saturating at `u64::MAX`.
            #[must_use]
            pub const fn next(self) -> Self {
                Self(self.0.saturating_add(1))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

counter!(
    /// Protocol epoch. Not less than 1.
    Epoch
);

counter!(
    /// Per-validator sequence number: self-parent's seq + 1, or 1.
    Seq
);

counter!(
    /// Consensus frame. Not less than 1.
    Frame
);
