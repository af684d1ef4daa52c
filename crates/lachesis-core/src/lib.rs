//! lachesis-core library.
//!
//! Event-graph bookkeeping for a DAG-based BFT consensus protocol. For every
//! event handed over by an ingestion collaborator, the core computes the
//! event's highest-events vector (a per-validator vector clock), flags
//! validators known to have forked, and classifies the event as a root.
//!
//! ```
//! use lachesis_core::{Dag, Epoch, Event, Frame, MissingParentPolicy, NodeId, Seq, ValidatorId, ValidatorSet};
//!
//! let alice = ValidatorId::new("alice");
//! let mut dag = Dag::new(ValidatorSet::uniform([alice.clone()], 1), MissingParentPolicy::Strict);
//! let first = Event::hashed(Epoch(1), Seq(1), Frame(1), alice.clone(), NodeId::new("n1"), vec![]);
//! let sealed = dag.ingest(first).unwrap();
//! assert!(sealed.is_root());
//! assert_eq!(sealed.vector(&alice).unwrap().seq, Seq(1));
//! ```
//!
//! # Conventions
//!
//! - **Errors**: `thiserror` enums in the library; `anyhow::Result` at the
//!   configuration boundary.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod config;
pub mod dag;
pub mod error;
pub mod event;
pub mod root;
pub mod vector;

pub use config::{ConsensusConfig, MissingParentPolicy, load_config};
pub use dag::{Dag, EventIndex, SharedDag};
pub use error::{ErrorCode, IngestError};
pub use event::{
    Epoch, Event, EventId, Frame, LineError, NodeId, SealedEvent, Seq, ValidatorId, parse_lines,
};
pub use root::{Classification, RootClassifier, RootStatus, ValidatorSet, forkless_cause};
pub use vector::{HighestEvents, Vector, compute_highest_events, detect_forks};
