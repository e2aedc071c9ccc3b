//! Planificador de grupos: lee la fuente, clasifica, particiona y emite
//! una `BuildUnit` por grupo de equivalencia.
//!
//! Siempre recorre la fuente completa: las bajas de grupos sólo se detectan
//! comparando el conjunto actual con BuildState.
use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use mat_classify::Classifier;
use mat_core::{with_retry, BuildError, BuildUnit, InputMarker, RetryPolicy};
use mat_domain::{CalculationRecord, StructureKey};
use mat_policies::{partition, RecordGroup, SetAside};

use crate::source::CalculationSource;

/// Resultado de planificar: unidades listas para el orquestador más los
/// registros apartados por run type no reconocido.
#[derive(Debug, Clone)]
pub struct GroupPlan {
    pub units: Vec<BuildUnit<RecordGroup>>,
    pub unrecognized: Vec<SetAside>,
}

impl GroupPlan {
    pub fn keys(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.key.as_str()).collect()
    }
}

pub struct GroupPlanner {
    classifier: Arc<Classifier>,
    retry: RetryPolicy,
}

impl GroupPlanner {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self { classifier,
               retry: RetryPolicy::default() }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn classifier(&self) -> &Arc<Classifier> {
        &self.classifier
    }

    /// Todos los registros de la fuente.
    pub fn load_all<S>(&self, source: &S) -> Result<Vec<CalculationRecord>, BuildError>
        where S: CalculationSource + ?Sized
    {
        let keys = with_retry(self.retry, "source.structure_keys", || source.structure_keys())?;
        let mut records = Vec::new();
        for key in &keys {
            let batch = with_retry(self.retry, "source.find_by_structure_key", || source.find_by_structure_key(key))?;
            records.extend(batch);
        }
        Ok(records)
    }

    /// Claves estructurales con registros modificados después de `since`.
    pub fn touched_keys<S>(&self, source: &S, since: DateTime<Utc>) -> Result<BTreeSet<StructureKey>, BuildError>
        where S: CalculationSource + ?Sized
    {
        let changed = with_retry(self.retry, "source.modified_since", || source.modified_since(since))?;
        Ok(changed.into_iter().map(|r| r.structure_key).collect())
    }

    /// Agrupa registros ya cargados.
    pub fn plan_records<I>(&self, records: I) -> GroupPlan
        where I: IntoIterator<Item = CalculationRecord>
    {
        let partition = partition(&self.classifier, records);
        let units: Vec<BuildUnit<RecordGroup>> = partition.groups
                                                          .into_values()
                                                          .map(|group| {
                                                              let inputs = markers(&group);
                                                              BuildUnit::new(group.key.clone(), inputs, group)
                                                          })
                                                          .collect();
        info!("planned {} groups ({} records set aside as unrecognized)",
              units.len(),
              partition.unrecognized.len());
        GroupPlan { units,
                    unrecognized: partition.unrecognized }
    }

    pub fn plan<S>(&self, source: &S) -> Result<GroupPlan, BuildError>
        where S: CalculationSource + ?Sized
    {
        Ok(self.plan_records(self.load_all(source)?))
    }
}

fn markers(group: &RecordGroup) -> Vec<InputMarker> {
    group.members
         .iter()
         .map(|m| InputMarker { id: m.record.calc_id.clone(),
                                last_modified: m.record.last_modified() })
         .collect()
}
