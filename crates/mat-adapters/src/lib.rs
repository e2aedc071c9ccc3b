//! mat-adapters: Capa de adaptación Dominio ↔ Core
//!
//! Este crate provee:
//! - `CalculationSource`: contrato de sólo lectura sobre los registros de
//!   cálculo, con una implementación en memoria.
//! - `GroupPlanner`: fuente → clasificación → partición → `BuildUnit`s con
//!   sus marcadores de input.
//! - `GroupProcessor`: el `UnitProcessor` del core para grupos de
//!   equivalencia (validez, bendición y merge).
//! - Estrategias de merge por tipo de documento (`materials`, `thermo`,
//!   `magnetism`).
//!
//! Nota: el core sólo conoce unidades con clave, marcadores y un payload
//! opaco; toda la semántica de materiales vive aquí y en `mat-policies`.

pub mod error;
pub mod merge;
pub mod planner;
pub mod processor;
pub mod source;

pub use error::MergeError;
pub use merge::{DocKind, MagnetismMerge, MaterialsMerge, MergeStrategy, ThermoMerge};
pub use planner::{GroupPlan, GroupPlanner};
pub use processor::GroupProcessor;
pub use source::{CalculationSource, InMemoryCalculationSource};
