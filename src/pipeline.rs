//! Cableado del pipeline completo: clasificador con tablas embebidas →
//! planificador de grupos → un pase del orquestador por tipo de documento.
use std::collections::BTreeMap;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;

use mat_adapters::{CalculationSource, DocKind, GroupPlanner, GroupProcessor, MagnetismMerge, MaterialsMerge, MergeStrategy, ThermoMerge};
use mat_classify::{Classifier, ClassifierConfig};
use mat_core::{BuildEventStore, BuildOrchestrator, BuildReport, BuildStateStore, BuildUnit, DocumentStore};
use mat_domain::{CalculationRecord, ClassificationResult, RecordState, StructureKey};
use mat_policies::{record_state, ClassifiedRecord, RecordGroup, SetAside};

use crate::config::AppConfig;
use crate::errors::AppError;

/// Fila de salida de `classify`: resultado del clasificador más la familia
/// de agrupación y el estado de validez del registro.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRow {
    pub calc_id: String,
    pub structure_key: StructureKey,
    #[serde(flatten)]
    pub result: ClassificationResult,
    pub family: Option<String>,
    pub state: RecordState,
}

/// Resultado de `build`: un reporte por tipo de documento, en el orden
/// pedido, y los registros apartados por run type no reconocido.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineRun {
    pub reports: Vec<BuildReport>,
    pub unrecognized: Vec<SetAside>,
    /// Por tipo de documento ya construido antes: estructuras con registros
    /// más nuevos que el último input incorporado.
    pub touched_structures: BTreeMap<String, Vec<StructureKey>>,
}

impl PipelineRun {
    pub fn failed(&self) -> usize {
        self.reports.iter().map(|r| r.failed).sum()
    }
}

pub struct MaterialsPipeline {
    planner: GroupPlanner,
}

impl MaterialsPipeline {
    /// Tablas embebidas con los overrides de tolerancia dados.
    pub fn new(config: ClassifierConfig) -> Result<Self, AppError> {
        Ok(Self::with_classifier(Arc::new(Classifier::bundled(config)?)))
    }

    pub fn with_classifier(classifier: Arc<Classifier>) -> Self {
        Self { planner: GroupPlanner::new(classifier) }
    }

    /// Clasificador y reintentos de lectura según `AppConfig`.
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let mut pipeline = Self::new(config.classifier.clone())?;
        pipeline.planner = pipeline.planner.with_retry(config.build.retry);
        Ok(pipeline)
    }

    pub fn classifier(&self) -> &Classifier {
        self.planner.classifier()
    }

    /// Clasifica registros sueltos, en el orden recibido.
    pub fn classify(&self, records: &[CalculationRecord]) -> Vec<ClassifiedRow> {
        let classifier = self.classifier();
        records.iter()
               .map(|record| {
                   let result = classifier.classify(record);
                   let family = classifier.grouping_family(record.software, &result.run_type);
                   let classified = ClassifiedRecord { record: record.clone(),
                                                       classification: result.clone() };
                   ClassifiedRow { calc_id: record.calc_id.clone(),
                                   structure_key: record.structure_key.clone(),
                                   result,
                                   family,
                                   state: record_state(&classified) }
               })
               .collect()
    }

    /// Un pase por cada tipo de documento de `kinds` sobre la misma
    /// planificación. Un pase abortado corta los siguientes.
    pub fn build<D, S, E, C>(&self,
                             orch: &mut BuildOrchestrator<D, S, E>,
                             source: &C,
                             kinds: &[DocKind])
                             -> Result<PipelineRun, AppError>
        where D: DocumentStore,
              S: BuildStateStore,
              E: BuildEventStore,
              C: CalculationSource + ?Sized
    {
        let plan = self.planner.plan(source)?;
        for aside in &plan.unrecognized {
            warn!("record {} set aside: {}", aside.calc_id, aside.reason);
        }
        let mut reports = Vec::with_capacity(kinds.len());
        let mut touched_structures = BTreeMap::new();
        for kind in kinds {
            if let Some(since) = orch.input_watermark(kind.as_str())? {
                let touched = self.planner.touched_keys(source, since)?;
                info!("{kind}: {} structures touched since {since}", touched.len());
                touched_structures.insert(kind.as_str().to_string(), touched.into_iter().collect());
            }
            let units = plan.units.clone();
            let report = match kind {
                DocKind::Materials => self.run(orch, MaterialsMerge, units)?,
                DocKind::Thermo => self.run(orch, ThermoMerge, units)?,
                DocKind::Magnetism => self.run(orch, MagnetismMerge, units)?,
            };
            reports.push(report);
        }
        info!("pipeline run finished: {} passes, {} groups, {} records set aside",
              reports.len(),
              plan.units.len(),
              plan.unrecognized.len());
        Ok(PipelineRun { reports,
                         unrecognized: plan.unrecognized,
                         touched_structures })
    }

    fn run<D, S, E, M>(&self,
                       orch: &mut BuildOrchestrator<D, S, E>,
                       strategy: M,
                       units: Vec<BuildUnit<RecordGroup>>)
                       -> Result<BuildReport, AppError>
        where D: DocumentStore,
              S: BuildStateStore,
              E: BuildEventStore,
              M: MergeStrategy
    {
        let processor = GroupProcessor::new(strategy, self.classifier().digest());
        Ok(orch.run_pass(&processor, units)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mat_domain::{InputParameters, Software};
    use serde_json::json;

    #[test]
    fn classify_keeps_input_order_and_reports_state() {
        let pipeline = MaterialsPipeline::new(ClassifierConfig::default()).unwrap();
        let input = |raw: serde_json::Value| {
            InputParameters::from_raw(Software::Vasp, raw.as_object().cloned().unwrap_or_default().iter()).unwrap()
        };
        let at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let records = vec![CalculationRecord::new("b-1", StructureKey::new("K").unwrap(), input(json!({"METAGGA": "FOO"})), at).unwrap(),
                           CalculationRecord::new("a-1", StructureKey::new("K").unwrap(), input(json!({"GGA": "PE"})), at).unwrap()];
        let rows = pipeline.classify(&records);
        assert_eq!(rows[0].calc_id, "b-1");
        assert_eq!(rows[0].state, RecordState::Unrecognized);
        assert_eq!(rows[0].family, None);
        assert_eq!(rows[1].family.as_deref(), Some("GGA"));
        let out = serde_json::to_value(&rows[1]).unwrap();
        assert_eq!(out["run_type"], json!("PBE"));
    }
}
