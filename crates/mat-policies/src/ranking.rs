//! Ranking de calidad por propiedad.
//!
//! Orden total: tier de especificidad del task type (menor es mejor), luego
//! `completed_at` más reciente, luego `calc_id` menor.
use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use mat_domain::{CalculationRecord, Property, TaskType};

/// Tiers por propiedad; un task type fuera de todos los tiers no es
/// candidato para esa propiedad.
pub fn tiers(property: Property) -> &'static [&'static [TaskType]] {
    match property {
        Property::Structure => &[&[TaskType::StructureOptimization], &[TaskType::Static, TaskType::Deformation]],
        Property::Energy | Property::Magnetism => &[&[TaskType::Static, TaskType::StructureOptimization]],
        Property::Dielectric => &[&[TaskType::Dfpt], &[TaskType::Dielectric], &[TaskType::Static]],
        Property::BandGap => &[&[TaskType::NscfLine], &[TaskType::NscfUniform], &[TaskType::Static]],
    }
}

pub fn tier_of(property: Property, task: TaskType) -> Option<usize> {
    tiers(property).iter().position(|tier| tier.contains(&task))
}

/// Clave de orden de un candidato; `Ord` la deja de mejor a peor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankKey {
    pub tier: usize,
    pub completed_at: DateTime<Utc>,
    pub calc_id: String,
}

impl RankKey {
    /// `None` si el registro no puede aportar la propiedad.
    pub fn of(property: Property, record: &CalculationRecord, task: TaskType) -> Option<Self> {
        if !property.is_present(&record.output) {
            return None;
        }
        let tier = tier_of(property, task)?;
        Some(Self { tier,
                    completed_at: record.completed_at,
                    calc_id: record.calc_id.clone() })
    }

    /// Mismo tier y misma fecha: el orden lo decide sólo el `calc_id`.
    pub fn ties_with(&self, other: &RankKey) -> bool {
        self.tier == other.tier && self.completed_at == other.completed_at
    }
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tier
            .cmp(&other.tier)
            .then_with(|| other.completed_at.cmp(&self.completed_at))
            .then_with(|| self.calc_id.cmp(&other.calc_id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
