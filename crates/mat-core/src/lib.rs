//! mat-core: motor de builds incrementales deterministas.
//!
//! Neutral respecto al dominio: agrupa nada, clasifica nada. Recibe unidades
//! (`BuildUnit`) ya agrupadas, calcula qué cambió respecto al último pase y
//! delega el contenido de cada documento en un `UnitProcessor`.
pub mod constants;
pub mod engine;
pub mod errors;
pub mod event;
pub mod hashing;
pub mod model;
pub mod repo;

pub use engine::{with_retry, BuildConfig, BuildOrchestrator, BuildReport, OrchestratorBuilder, RetryPolicy, UnitProcessor};
pub use errors::{BuildError, GroupProcessingFailure, StoreError};
pub use event::{BuildEvent, BuildEventKind, BuildEventStore, BuildPhase, InMemoryEventStore, NullEventStore};
pub use model::{BuildMeta, BuildUnit, DocState, DocumentFields, InputMarker, OutputDocument, ProvenancedField};
pub use repo::{BuildStateEntry, BuildStateStore, DocumentStore, InMemoryBuildStateStore, InMemoryDocumentStore};
