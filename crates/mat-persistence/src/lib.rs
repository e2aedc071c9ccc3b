//! mat-persistence
//!
//! Stores sobre archivos JSON para ejecutar el pipeline entre procesos:
//! documentos, BuildState, registros de cálculo y bitácora de eventos,
//! todos bajo un mismo directorio (`MATFLOW_STORE_DIR`).
//!
//! Módulos:
//! - `files`: mapa JSON con escritura atómica (temporal + rename).
//! - `documents` / `build_state`: un archivo por tipo de documento.
//! - `records`: `CalculationSource` sobre `records.json` e ingesta.
//! - `events`: `BuildEventStore` append-only en JSON lines.
//! - `config`: carga de configuración desde .env.

pub mod build_state;
pub mod config;
pub mod documents;
pub mod error;
pub mod events;
pub mod files;
pub mod records;

pub use build_state::JsonBuildStateStore;
pub use config::{init_dotenv, StoreConfig};
pub use documents::JsonDocumentStore;
pub use error::PersistenceError;
pub use events::JsonlEventStore;
pub use records::{read_records_file, JsonRecordStore};

use mat_core::{BuildOrchestrator, OrchestratorBuilder};

pub type FileOrchestratorBuilder = OrchestratorBuilder<JsonDocumentStore, JsonBuildStateStore, JsonlEventStore>;

/// Builder de orquestador con las tres stores de archivo bajo `config.dir`.
pub fn file_orchestrator(config: &StoreConfig) -> Result<FileOrchestratorBuilder, PersistenceError> {
    let events = JsonlEventStore::open(&config.dir)?;
    Ok(BuildOrchestrator::builder(JsonDocumentStore::open(&config.dir),
                                  JsonBuildStateStore::open(&config.dir),
                                  events))
}
