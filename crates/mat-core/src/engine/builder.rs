//! Builder para `BuildOrchestrator`.
//!
//! Las stores son obligatorias desde el inicio; el resto de la
//! configuración se encadena con valores por defecto razonables:
//!
//! ```ignore
//! let mut orch = BuildOrchestrator::in_memory()
//!     .chunk_size(500)
//!     .sequential()
//!     .build();
//! ```

use crate::engine::{BuildConfig, BuildOrchestrator, RetryPolicy};
use crate::event::BuildEventStore;
use crate::repo::{BuildStateStore, DocumentStore};

#[derive(Debug)]
pub struct OrchestratorBuilder<D, S, E>
    where D: DocumentStore,
          S: BuildStateStore,
          E: BuildEventStore
{
    documents: D,
    state: S,
    events: E,
    config: BuildConfig,
}

impl<D, S, E> OrchestratorBuilder<D, S, E>
    where D: DocumentStore,
          S: BuildStateStore,
          E: BuildEventStore
{
    pub fn new(documents: D, state: S, events: E) -> Self {
        Self { documents,
               state,
               events,
               config: BuildConfig::default() }
    }

    /// Reemplaza la configuración completa.
    pub fn config(mut self, config: BuildConfig) -> Self {
        self.config = config;
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = Some(chunk_size);
        self
    }

    pub fn force_full_rebuild(mut self, force: bool) -> Self {
        self.config.force_full_rebuild = force;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.config.parallel = false;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    #[inline]
    pub fn build(self) -> BuildOrchestrator<D, S, E> {
        BuildOrchestrator::new(self.documents, self.state, self.events, self.config)
    }
}
