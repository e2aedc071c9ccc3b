//! Chequeos de validez. Un miembro que falla queda en el grupo como
//! `Deprecated` (con motivos) y nunca es bendecido.
use mat_domain::{RecordState, TaskType};

use crate::grouping::ClassifiedRecord;

pub const UNCONVERGED_ELECTRONIC: &str = "unconverged electronic steps";
pub const UNCONVERGED_IONIC: &str = "unconverged ionic steps";
pub const MISSING_ENERGY: &str = "missing or non-finite energy";
pub const UNRECOGNIZED_TASK: &str = "unrecognized task type";

/// Motivos de deprecación, en orden fijo; vacío si el registro es válido.
pub fn deprecation_reasons(member: &ClassifiedRecord) -> Vec<String> {
    let output = &member.record.output;
    let task = member.classification.task_type;
    let mut reasons = Vec::new();
    if !output.converged_electronic {
        reasons.push(UNCONVERGED_ELECTRONIC.to_string());
    }
    if task.is_relaxation() && !output.converged_ionic {
        reasons.push(UNCONVERGED_IONIC.to_string());
    }
    if !output.energy.map(f64::is_finite).unwrap_or(false) {
        reasons.push(MISSING_ENERGY.to_string());
    }
    if task == TaskType::Unrecognized {
        reasons.push(UNRECOGNIZED_TASK.to_string());
    }
    reasons
}

pub fn record_state(member: &ClassifiedRecord) -> RecordState {
    if !member.classification.is_recognized() {
        return RecordState::Unrecognized;
    }
    let reasons = deprecation_reasons(member);
    if reasons.is_empty() {
        RecordState::Active
    } else {
        RecordState::Deprecated { reasons }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mat_domain::{CalculationOutput, CalculationRecord, ClassificationResult, ClassificationStatus, InputParameters, RunType, Software,
                     StructureKey};

    fn member(task: TaskType, output: CalculationOutput) -> ClassifiedRecord {
        let record = CalculationRecord::new("mp-1",
                                            StructureKey::new("K").unwrap(),
                                            InputParameters::empty(Software::Vasp),
                                            Utc::now()).unwrap()
                                                       .with_output(output);
        ClassifiedRecord { record,
                           classification: ClassificationResult::new(RunType::new("GGA"),
                                                                     task,
                                                                     ClassificationStatus::Recognized) }
    }

    #[test]
    fn valid_record_is_active() {
        let m = member(TaskType::Static, CalculationOutput { energy: Some(-1.0), ..Default::default() });
        assert_eq!(record_state(&m), RecordState::Active);
    }

    #[test]
    fn ionic_convergence_only_matters_for_relaxations() {
        let out = CalculationOutput { energy: Some(-1.0),
                                      converged_ionic: false,
                                      ..Default::default() };
        assert!(deprecation_reasons(&member(TaskType::Static, out.clone())).is_empty());
        assert_eq!(deprecation_reasons(&member(TaskType::StructureOptimization, out)),
                   vec![UNCONVERGED_IONIC.to_string()]);
    }

    #[test]
    fn reasons_accumulate() {
        let out = CalculationOutput { energy: Some(f64::NAN),
                                      converged_electronic: false,
                                      ..Default::default() };
        let state = record_state(&member(TaskType::Unrecognized, out));
        assert_eq!(state,
                   RecordState::Deprecated { reasons: vec![UNCONVERGED_ELECTRONIC.to_string(),
                                                           MISSING_ENERGY.to_string(),
                                                           UNRECOGNIZED_TASK.to_string()] });
    }
}
