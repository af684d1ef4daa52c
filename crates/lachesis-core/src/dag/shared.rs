//! Thread-safe handle for pipelines that ingest from several streams.
//!
//! Sealing reads parent state and writes the result back, so at most one
//! event is sealed at a time: [`SharedDag::ingest`] holds the write lock for
//! the whole read-compute-insert sequence. Queries against sealed events take
//! the read lock and run concurrently with each other.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::IngestError;
use crate::event::{Event, EventId, SealedEvent};

use super::Dag;

/// Cloneable, lock-protected [`Dag`].
#[derive(Debug, Clone)]
pub struct SharedDag {
    inner: Arc<RwLock<Dag>>,
}

impl SharedDag {
    #[must_use]
    pub fn new(dag: Dag) -> Self {
        Self {
            inner: Arc::new(RwLock::new(dag)),
        }
    }

    /// Seal `event` under the write lock and return a copy of the result.
    ///
    /// # Errors
    ///
    /// Propagates [`Dag::ingest`] errors, or [`IngestError::Poisoned`] if a
    /// previous writer panicked.
    pub fn ingest(&self, event: Event) -> Result<SealedEvent, IngestError> {
        let mut dag = self.write()?;
        let sealed = dag.ingest(event)?.clone();
        Ok(sealed)
    }

    /// A copy of the sealed event with `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Poisoned`] if a writer panicked.
    pub fn get(&self, id: &EventId) -> Result<Option<SealedEvent>, IngestError> {
        Ok(self.read()?.get(id).cloned())
    }

    /// Run `f` with shared access to the DAG.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Poisoned`] if a writer panicked.
    pub fn with_read<T>(&self, f: impl FnOnce(&Dag) -> T) -> Result<T, IngestError> {
        let guard = self.read()?;
        Ok(f(&guard))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Dag>, IngestError> {
        self.inner.read().map_err(|_| IngestError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Dag>, IngestError> {
        self.inner.write().map_err(|_| IngestError::Poisoned)
    }
}

impl From<Dag> for SharedDag {
    fn from(dag: Dag) -> Self {
        Self::new(dag)
    }
}
