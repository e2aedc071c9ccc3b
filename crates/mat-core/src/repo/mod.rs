pub mod types;

pub use types::{BuildStateEntry, BuildStateStore, DocumentStore, InMemoryBuildStateStore, InMemoryDocumentStore};
