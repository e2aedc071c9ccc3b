// mat-domain: registros de cálculo y etiquetas canónicas
pub mod calc_types;
pub mod error;
pub mod params;
pub mod property;
pub mod record;
pub mod software;
pub mod vocabulary;

pub use calc_types::{CalcType, ClassificationResult, ClassificationStatus, RecordState, RunType, TaskType};
pub use error::DomainError;
pub use params::{InputParameters, ParamKind, ParamValue};
pub use property::Property;
pub use record::{CalculationOutput, CalculationRecord, KpointSettings, RawCalculationRecord, StructureKey};
pub use software::Software;
pub use vocabulary::{vocabulary, ParamSpec, Vocabulary};
