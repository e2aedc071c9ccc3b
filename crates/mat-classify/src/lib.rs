//! mat-classify: clasificación de cálculos en run / task / calc types.
//!
//! Flujo: `RuleTableDocument` (YAML o fuente canónica) → `RuleTable`
//! validada → `Classifier` (tablas + `ClassifierConfig`) →
//! `ClassificationResult` por registro.
pub mod classifier;
pub mod error;
pub mod matcher;
pub mod source;
pub mod table;
pub mod task_type;

pub use classifier::{Classifier, ClassifierConfig};
pub use error::ConfigError;
pub use matcher::values_match;
pub use source::{canonical_qchem_source, canonical_source, canonical_vasp_source, RuleTableDocument};
pub use table::{Rule, RuleFamily, RuleTable};
pub use task_type::{task_type, CalcCharacter};
