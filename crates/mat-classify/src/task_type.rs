//! Árboles de decisión de task type, independientes del run type.
//!
//! El orden importa: varias banderas coexisten (un cálculo dieléctrico
//! también es técnicamente estático), así que las etiquetas más específicas
//! se evalúan primero.
use mat_domain::{CalculationRecord, Software, TaskType};

/// Banderas que describen el carácter de un cálculo, ya con defaults
/// resueltos.
#[derive(Debug, Clone, PartialEq)]
pub struct CalcCharacter {
    pub software: Software,
    pub icharg: i64,
    pub ibrion: i64,
    pub nsw: i64,
    pub isif: i64,
    pub lepsilon: bool,
    pub loptics: bool,
    pub lchimag: bool,
    pub lefg: bool,
    pub mdalgo: i64,
    pub line_mode: bool,
    pub job_type: Option<String>,
}

impl CalcCharacter {
    pub fn from_record(record: &CalculationRecord) -> Self {
        let p = &record.input;
        let nsw = p.get_int("NSW").unwrap_or(0);
        // IBRION por defecto: -1 si NSW ∈ {-1, 0, 1}, 0 en otro caso.
        let ibrion = p.get_int("IBRION").unwrap_or(if nsw <= 1 { -1 } else { 0 });
        Self { software: record.software,
               icharg: p.get_int("ICHARG").unwrap_or(2),
               ibrion,
               nsw,
               isif: p.get_int("ISIF").unwrap_or(2),
               lepsilon: p.get_bool("LEPSILON").unwrap_or(false),
               loptics: p.get_bool("LOPTICS").unwrap_or(false),
               lchimag: p.get_bool("LCHIMAG").unwrap_or(false),
               lefg: p.get_bool("LEFG").unwrap_or(false),
               mdalgo: p.get_int("MDALGO").unwrap_or(0),
               line_mode: record.is_line_mode(),
               job_type: p.get_str("JOB_TYPE").map(|j| j.trim().to_ascii_lowercase()) }
    }
}

pub fn task_type(character: &CalcCharacter) -> TaskType {
    match character.software {
        Software::Vasp => vasp_task_type(character),
        Software::QChem => qchem_task_type(character),
    }
}

fn vasp_task_type(c: &CalcCharacter) -> TaskType {
    if c.icharg > 10 {
        return if c.line_mode { TaskType::NscfLine } else { TaskType::NscfUniform };
    }
    if matches!(c.ibrion, 7 | 8) {
        return TaskType::Dfpt;
    }
    if c.lepsilon {
        return TaskType::Dielectric;
    }
    if c.lchimag {
        return TaskType::NmrNuclearShielding;
    }
    if c.lefg {
        return TaskType::NmrElectricFieldGradient;
    }
    if c.nsw > 1 && (c.ibrion == 0 || c.mdalgo != 0) {
        return TaskType::MolecularDynamics;
    }
    if c.nsw <= 1 || c.ibrion == -1 {
        return if c.loptics { TaskType::Optic } else { TaskType::Static };
    }
    if (1..=3).contains(&c.ibrion) {
        return if c.isif >= 3 { TaskType::StructureOptimization } else { TaskType::Deformation };
    }
    TaskType::Unrecognized
}

fn qchem_task_type(c: &CalcCharacter) -> TaskType {
    match c.job_type.as_deref().unwrap_or("sp") {
        "sp" | "force" => TaskType::Static,
        "opt" | "ts" => TaskType::StructureOptimization,
        "freq" => TaskType::FrequencyAnalysis,
        "aimd" => TaskType::MolecularDynamics,
        "nmr" => TaskType::NmrNuclearShielding,
        _ => TaskType::Unrecognized,
    }
}

/// Etiquetas que el árbol del software puede emitir; la tabla de reglas
/// debe permitirlas todas.
pub fn emitted_task_types(software: Software) -> &'static [TaskType] {
    match software {
        Software::Vasp => &[TaskType::NscfLine,
                            TaskType::NscfUniform,
                            TaskType::Dfpt,
                            TaskType::Dielectric,
                            TaskType::NmrNuclearShielding,
                            TaskType::NmrElectricFieldGradient,
                            TaskType::MolecularDynamics,
                            TaskType::Optic,
                            TaskType::Static,
                            TaskType::StructureOptimization,
                            TaskType::Deformation,
                            TaskType::Unrecognized],
        Software::QChem => &[TaskType::Static,
                             TaskType::StructureOptimization,
                             TaskType::FrequencyAnalysis,
                             TaskType::MolecularDynamics,
                             TaskType::NmrNuclearShielding,
                             TaskType::Unrecognized],
    }
}
