//! MatFlow Rust Library
//!
//! Este crate actúa como fachada del workspace:
//! - `config`: `AppConfig` a partir de `.env` y variables `MATFLOW_*`.
//! - `pipeline`: `MaterialsPipeline`, que conecta clasificación, agrupación
//!   y los pases incrementales por tipo de documento.
//! - `errors`: `AppError`, con la distinción entrada rechazada / fallo de
//!   ejecución que usa la CLI.
//!
//! Los crates miembros se re-exportan para clientes que necesiten piezas
//! sueltas.

pub mod config;
pub mod errors;
pub mod pipeline;

pub use config::AppConfig;
pub use errors::AppError;
pub use pipeline::{ClassifiedRow, MaterialsPipeline, PipelineRun};

pub use mat_adapters;
pub use mat_classify;
pub use mat_core;
pub use mat_domain;
pub use mat_persistence;
pub use mat_policies;
