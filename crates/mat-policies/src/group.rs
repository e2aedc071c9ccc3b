//! Grupo de equivalencia validado y bendecido.
//!
//! Se recalcula desde cero en cada pase a partir de un `RecordGroup`; nunca
//! se muta incrementalmente.
use std::collections::{BTreeMap, BTreeSet};

use log::debug;
use serde::{Deserialize, Serialize};

use mat_domain::{CalculationRecord, ClassificationResult, Property, RecordState, StructureKey};

use crate::grouping::RecordGroup;
use crate::validity::record_state;
use crate::{BlessingDecision, BlessingParams, BlessingPolicy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMember {
    pub record: CalculationRecord,
    pub classification: ClassificationResult,
    pub state: RecordState,
}

impl GroupMember {
    pub fn calc_id(&self) -> &str {
        &self.record.calc_id
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupStatus {
    /// Todas las propiedades tienen bendición.
    Complete,
    /// Alguna propiedad quedó explícitamente sin bendecir.
    Partial,
    /// Ninguna propiedad pudo bendecirse.
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquivalenceGroup {
    pub key: String,
    pub structure_key: StructureKey,
    pub family: String,
    /// Ordenados por `calc_id`; incluye deprecados.
    pub members: Vec<GroupMember>,
    pub blessings: BTreeMap<Property, BlessingDecision>,
    pub missing: BTreeSet<Property>,
    pub status: GroupStatus,
}

impl EquivalenceGroup {
    /// Valida miembros y bendice cada propiedad de forma independiente.
    pub fn assemble<P>(group: RecordGroup, policy: &P, params: &BlessingParams) -> Self
        where P: BlessingPolicy + ?Sized
    {
        let mut members: Vec<GroupMember> = group.members
                                                 .into_iter()
                                                 .map(|m| {
                                                     let state = record_state(&m);
                                                     GroupMember { record: m.record,
                                                                   classification: m.classification,
                                                                   state }
                                                 })
                                                 .collect();
        members.sort_by(|a, b| a.record.calc_id.cmp(&b.record.calc_id));

        let mut blessings = BTreeMap::new();
        let mut missing = BTreeSet::new();
        for property in Property::ALL {
            match policy.bless(property, &members, params) {
                Some(decision) => {
                    blessings.insert(property, decision);
                }
                None => {
                    missing.insert(property);
                }
            }
        }
        let status = if missing.is_empty() {
            GroupStatus::Complete
        } else if blessings.is_empty() {
            GroupStatus::Empty
        } else {
            GroupStatus::Partial
        };
        debug!("group {}: {} members, {} blessed, {:?}",
               group.key,
               members.len(),
               blessings.len(),
               status);
        Self { key: group.key,
               structure_key: group.structure_key,
               family: group.family,
               members,
               blessings,
               missing,
               status }
    }

    pub fn member(&self, calc_id: &str) -> Option<&GroupMember> {
        self.members.iter().find(|m| m.calc_id() == calc_id)
    }

    /// Miembro bendecido para `property`.
    pub fn blessed(&self, property: Property) -> Option<&GroupMember> {
        self.blessings.get(&property).and_then(|d| self.member(&d.selected))
    }

    pub fn active_members(&self) -> impl Iterator<Item = &GroupMember> {
        self.members.iter().filter(|m| m.is_active())
    }

    pub fn deprecated_ids(&self) -> Vec<&str> {
        self.members.iter().filter(|m| !m.is_active()).map(GroupMember::calc_id).collect()
    }

    pub fn is_missing(&self, property: Property) -> bool {
        self.missing.contains(&property)
    }
}
