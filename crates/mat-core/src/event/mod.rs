//! Definiciones de eventos de build y trait `BuildEventStore`.

mod store;
mod types;

pub use store::{BuildEventStore, InMemoryEventStore, NullEventStore};
pub use types::{BuildEvent, BuildEventKind, BuildPhase};
