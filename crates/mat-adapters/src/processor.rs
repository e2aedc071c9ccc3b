//! Procesador de grupos: valida, bendice y aplica la estrategia de merge.
//! Un grupo sin nada bendecido produce un documento marcado `Empty` en
//! lugar de un fallo.
//!
//! Implementa `UnitProcessor<RecordGroup>` del core. El digest combina la
//! huella del clasificador (tablas + tolerancias), la política de bendición
//! y la versión de la estrategia: cambiar cualquiera ensucia todos los
//! grupos en el siguiente pase.
use log::debug;
use serde_json::json;

use mat_core::hashing::hash_value;
use mat_core::{BuildUnit, DocumentFields, GroupProcessingFailure, UnitProcessor};
use mat_policies::{params_hash, BlessingParams, BlessingPolicy, EquivalenceGroup, GroupStatus, QualityRankPolicy, RecordGroup};

use crate::merge::{empty_group_fields, MergeStrategy};

pub struct GroupProcessor<M, P = QualityRankPolicy> {
    strategy: M,
    policy: P,
    params: BlessingParams,
    classifier_digest: String,
}

impl<M: MergeStrategy> GroupProcessor<M> {
    pub fn new(strategy: M, classifier_digest: impl Into<String>) -> Self {
        Self { strategy,
               policy: QualityRankPolicy::new(),
               params: BlessingParams::default(),
               classifier_digest: classifier_digest.into() }
    }
}

impl<M, P> GroupProcessor<M, P>
    where M: MergeStrategy,
          P: BlessingPolicy
{
    pub fn strategy(&self) -> &M {
        &self.strategy
    }

    /// Grupo validado y bendecido (sin merge).
    pub fn assemble(&self, group: &RecordGroup) -> EquivalenceGroup {
        EquivalenceGroup::assemble(group.clone(), &self.policy, &self.params)
    }
}

impl<M, P> UnitProcessor<RecordGroup> for GroupProcessor<M, P>
    where M: MergeStrategy,
          P: BlessingPolicy
{
    fn doc_type(&self) -> &str {
        self.strategy.doc_type()
    }

    fn digest(&self) -> String {
        hash_value(&json!({
            "strategy": self.strategy.doc_type(),
            "strategy_version": self.strategy.version(),
            "classifier": self.classifier_digest,
            "policy": self.policy.id(),
            "policy_params": params_hash(&self.params),
        }))
    }

    fn process(&self, unit: &BuildUnit<RecordGroup>) -> Result<DocumentFields, GroupProcessingFailure> {
        let group = self.assemble(&unit.payload);
        debug!("merging {} into {} ({:?})", unit.key, self.strategy.doc_type(), group.status);
        let fields = match group.status {
            GroupStatus::Empty => empty_group_fields(&group),
            GroupStatus::Complete | GroupStatus::Partial => self.strategy.merge(&group),
        };
        fields.map_err(|e| GroupProcessingFailure::new(unit.key.clone(), e.to_string()))
    }
}
