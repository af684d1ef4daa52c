//! The event DAG: sealed-event index and ingestion pipeline.
//!
//! # Sub-modules
//!
//! - [`index`]: id-keyed storage of sealed events with root sets,
//!   equivocation slots and ancestry traversal. ([`EventIndex`])
//! - [`ingest`]: the read-parents, aggregate, detect-forks, classify, insert
//!   pipeline. ([`Dag`])
//! - [`shared`]: single-writer, many-reader handle for concurrent ingestion
//!   pipelines. ([`SharedDag`])
//!
//! # Ordering
//!
//! Events must be ingested parents-first. A sealed event's vector is a
//! snapshot of what its parents knew: a fork discovered later does not
//! update events sealed before it.

pub mod index;
pub mod ingest;
pub mod shared;

pub use index::EventIndex;
pub use ingest::Dag;
pub use shared::SharedDag;
