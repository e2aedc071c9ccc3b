//! Run type, task type y calc type canónicos.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

pub const UNRECOGNIZED: &str = "Unrecognized";
pub const HUBBARD_SUFFIX: &str = "+U";

/// Etiqueta canónica de método/funcional (`GGA`, `GGA+U`, `r2SCAN`...).
///
/// Sólo `mat-classify` crea run types reconocidos, siempre con la grafía
/// canónica de la tabla de reglas.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunType(String);

impl RunType {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn unrecognized() -> Self {
        Self(UNRECOGNIZED.to_string())
    }

    pub fn is_unrecognized(&self) -> bool {
        self.0 == UNRECOGNIZED
    }

    pub fn is_hubbard(&self) -> bool {
        self.0.ends_with(HUBBARD_SUFFIX)
    }

    /// Etiqueta sin el sufijo `+U`.
    pub fn base_label(&self) -> &str {
        self.0.strip_suffix(HUBBARD_SUFFIX).unwrap_or(&self.0)
    }

    pub fn with_hubbard(&self) -> Self {
        if self.is_hubbard() || self.is_unrecognized() {
            self.clone()
        } else {
            Self(format!("{}{}", self.0, HUBBARD_SUFFIX))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lista fija de task types. El orden de declaración es de más a menos
/// específico.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum TaskType {
    NscfLine,
    NscfUniform,
    Dielectric,
    Dfpt,
    NmrNuclearShielding,
    NmrElectricFieldGradient,
    Static,
    StructureOptimization,
    Deformation,
    Optic,
    MolecularDynamics,
    FrequencyAnalysis,
    Unrecognized,
}

impl TaskType {
    pub const ALL: [TaskType; 13] = [TaskType::NscfLine,
                                     TaskType::NscfUniform,
                                     TaskType::Dielectric,
                                     TaskType::Dfpt,
                                     TaskType::NmrNuclearShielding,
                                     TaskType::NmrElectricFieldGradient,
                                     TaskType::Static,
                                     TaskType::StructureOptimization,
                                     TaskType::Deformation,
                                     TaskType::Optic,
                                     TaskType::MolecularDynamics,
                                     TaskType::FrequencyAnalysis,
                                     TaskType::Unrecognized];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::NscfLine => "NSCF Line",
            TaskType::NscfUniform => "NSCF Uniform",
            TaskType::Dielectric => "Dielectric",
            TaskType::Dfpt => "DFPT",
            TaskType::NmrNuclearShielding => "NMR Nuclear Shielding",
            TaskType::NmrElectricFieldGradient => "NMR Electric Field Gradient",
            TaskType::Static => "Static",
            TaskType::StructureOptimization => "Structure Optimization",
            TaskType::Deformation => "Deformation",
            TaskType::Optic => "Optic",
            TaskType::MolecularDynamics => "Molecular Dynamics",
            TaskType::FrequencyAnalysis => "Frequency Analysis",
            TaskType::Unrecognized => UNRECOGNIZED,
        }
    }

    /// Relajaciones: las únicas donde la convergencia iónica importa.
    pub fn is_relaxation(&self) -> bool {
        matches!(self, TaskType::StructureOptimization | TaskType::Deformation)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = DomainError;

    /// Insensible a mayúsculas y a espacios extra.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm = s.split_whitespace().collect::<Vec<_>>().join(" ");
        TaskType::ALL.iter()
                     .find(|t| t.as_str().eq_ignore_ascii_case(&norm))
                     .copied()
                     .ok_or_else(|| DomainError::ValidationError(format!("unknown task type: {s}")))
    }
}

impl From<TaskType> for String {
    fn from(t: TaskType) -> Self {
        t.as_str().to_string()
    }
}

impl TryFrom<String> for TaskType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// `"{run_type} {task_type}"`, clave de todas las tablas de ranking.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalcType(String);

impl CalcType {
    pub fn new(run_type: &RunType, task_type: TaskType) -> Self {
        Self(format!("{} {}", run_type, task_type))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CalcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationStatus {
    Recognized,
    /// Varias reglas de igual prioridad coincidieron; se conserva la primera.
    Ambiguous { candidates: Vec<String> },
    Unrecognized { reason: String },
}

/// Resultado derivado de clasificar un registro. Nunca se persiste.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub run_type: RunType,
    pub task_type: TaskType,
    pub calc_type: CalcType,
    pub status: ClassificationStatus,
}

impl ClassificationResult {
    pub fn new(run_type: RunType, task_type: TaskType, status: ClassificationStatus) -> Self {
        let calc_type = CalcType::new(&run_type, task_type);
        Self { run_type,
               task_type,
               calc_type,
               status }
    }

    pub fn is_recognized(&self) -> bool {
        !self.run_type.is_unrecognized()
    }
}

/// Estado explícito de un miembro de grupo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    Active,
    Deprecated { reasons: Vec<String> },
    Unrecognized,
}

impl RecordState {
    pub fn is_active(&self) -> bool {
        matches!(self, RecordState::Active)
    }
}
