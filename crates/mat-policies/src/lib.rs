//! mat-policies – agrupación, validez y bendición por propiedad
//!
//! Provee la partición en grupos de equivalencia y una política de
//! bendición (QualityRank) determinista y auditable: cada decisión lleva un
//! rationale con el id de la política, el hash de sus parámetros, cuántos
//! candidatos se consideraron y los empates resueltos.
pub mod group;
pub mod grouping;
pub mod ranking;
pub mod validity;

use mat_core::hashing::hash_value;
use mat_domain::Property;
use serde::{Deserialize, Serialize};

pub use group::{EquivalenceGroup, GroupMember, GroupStatus};
pub use grouping::{group_key, partition, ClassifiedRecord, Partition, RecordGroup, SetAside, GROUP_KEY_SEPARATOR};
pub use ranking::{tier_of, tiers, RankKey};
pub use validity::{deprecation_reasons, record_state};

/// Parámetros de bendición soportados.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "policy", content = "params")]
pub enum BlessingParams {
    QualityRank(QualityRankParams),
}

impl Default for BlessingParams {
    fn default() -> Self {
        BlessingParams::QualityRank(QualityRankParams::default())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QualityRankParams {
    pub tie_break: TieRule,
}

impl Default for QualityRankParams {
    fn default() -> Self {
        Self { tie_break: TieRule::NewestThenLowestId }
    }
}

/// Regla de desempate determinista.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TieRule {
    /// Dentro del mismo tier: `completed_at` desc, luego `calc_id` asc.
    NewestThenLowestId,
}

/// Decisión de bendición para una propiedad.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlessingDecision {
    pub property: Property,
    /// `calc_id` bendecido.
    pub selected: String,
    pub policy_id: String,
    pub params_hash: String,
    pub rationale: Rationale,
}

/// Explicación tipada de la decisión.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Rationale {
    pub policy_id: String,
    pub params: BlessingParams,
    pub considered_n: usize,
    pub selected: String,
    /// Tier (0 = más específico) del bendecido.
    pub tier: usize,
    /// Candidatos que empataban en tier y fecha con el bendecido (incluido).
    pub ties: Vec<String>,
    pub tie_break_rule: TieRule,
}

/// Contrato de políticas de bendición deterministas.
///
/// Sólo miembros activos son elegibles. `None` = propiedad sin candidatos,
/// nunca un error.
pub trait BlessingPolicy: Sync {
    fn id(&self) -> &'static str;
    fn bless(&self, property: Property, members: &[GroupMember], params: &BlessingParams) -> Option<BlessingDecision>;
}

/// Política: mejor tier de task type, luego más reciente, luego id menor.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityRankPolicy;

impl QualityRankPolicy {
    pub fn new() -> Self {
        Self
    }
}

impl BlessingPolicy for QualityRankPolicy {
    fn id(&self) -> &'static str {
        "quality_rank"
    }

    fn bless(&self, property: Property, members: &[GroupMember], params: &BlessingParams) -> Option<BlessingDecision> {
        let BlessingParams::QualityRank(qr_params) = params;
        let mut ranked: Vec<RankKey> = members.iter()
                                              .filter(|m| m.is_active())
                                              .filter_map(|m| RankKey::of(property, &m.record, m.classification.task_type))
                                              .collect();
        match qr_params.tie_break {
            TieRule::NewestThenLowestId => ranked.sort(),
        }
        let best = ranked.first()?;
        let ties: Vec<String> = ranked.iter()
                                      .filter(|k| k.ties_with(best))
                                      .map(|k| k.calc_id.clone())
                                      .collect();
        let rationale = Rationale { policy_id: self.id().into(),
                                    params: params.clone(),
                                    considered_n: ranked.len(),
                                    selected: best.calc_id.clone(),
                                    tier: best.tier,
                                    ties,
                                    tie_break_rule: qr_params.tie_break };
        Some(BlessingDecision { property,
                                selected: best.calc_id.clone(),
                                policy_id: self.id().into(),
                                params_hash: params_hash(params),
                                rationale })
    }
}

/// Hash canónico de parámetros.
pub fn params_hash(params: &BlessingParams) -> String {
    match serde_json::to_value(params) {
        Ok(v) => hash_value(&v),
        Err(e) => format!("unhashable:{e}"),
    }
}
