//! Documento `materials`: resumen del material por grupo.
//!
//! Precedencia de la estructura: la bendecida para `Structure` (una
//! relajación gana a un estático); si no hay, la del registro bendecido para
//! `Energy`. Sin ninguna de las dos el grupo falla.
use std::collections::BTreeMap;

use serde_json::{json, Value};

use mat_core::{DocumentFields, ProvenancedField};
use mat_domain::Property;
use mat_policies::{EquivalenceGroup, GroupMember};

use super::{put, put_group, put_status, to_json, MergeStrategy};
use crate::MergeError;

pub const DOC_TYPE: &str = "materials";

#[derive(Debug, Clone, Copy, Default)]
pub struct MaterialsMerge;

impl MaterialsMerge {
    fn structure_source(group: &EquivalenceGroup) -> Result<(&GroupMember, &'static str), MergeError> {
        if let Some(m) = group.blessed(Property::Structure) {
            return Ok((m, "structure"));
        }
        match group.blessed(Property::Energy) {
            Some(m) if Property::Structure.is_present(&m.record.output) => Ok((m, "energy")),
            _ => Err(MergeError::missing(&group.key, Property::Structure)),
        }
    }
}

impl MergeStrategy for MaterialsMerge {
    fn doc_type(&self) -> &str {
        DOC_TYPE
    }

    fn version(&self) -> &str {
        "materials-1"
    }

    fn merge(&self, group: &EquivalenceGroup) -> Result<DocumentFields, MergeError> {
        let mut fields = DocumentFields::new();

        let (structure_from, origin) = Self::structure_source(group)?;
        let structure = structure_from.record.output.structure.clone().unwrap_or(Value::Null);
        put(&mut fields, "structure", structure, structure_from);
        put(&mut fields, "structure_origin", json!(origin), structure_from);
        put_group(&mut fields, "structure_key", json!(group.structure_key.as_str()), group);
        put_group(&mut fields, "run_type_family", json!(group.family), group);

        if let Some(m) = group.blessed(Property::Energy) {
            put(&mut fields, "energy", json!(m.record.output.energy), m);
            if let Some(epa) = m.record.output.energy_per_atom {
                put(&mut fields, "energy_per_atom", json!(epa), m);
            }
        }
        if let Some(m) = group.blessed(Property::Magnetism) {
            put(&mut fields, "total_magnetization", json!(m.record.output.total_magnetization), m);
            put(&mut fields, "magnetic_moments", json!(m.record.output.magnetic_moments), m);
        }
        if let Some(m) = group.blessed(Property::BandGap) {
            put(&mut fields, "band_gap", json!(m.record.output.bandgap), m);
        }
        if let Some(m) = group.blessed(Property::Dielectric) {
            put(&mut fields, "dielectric", m.record.output.dielectric.clone().unwrap_or(Value::Null), m);
        }

        let calc_types: BTreeMap<&str, String> =
            group.members.iter().map(|m| (m.calc_id(), m.classification.calc_type.to_string())).collect();
        put_group(&mut fields, "calc_types", to_json("calc_types", &calc_types)?, group);

        let blessings: BTreeMap<&str, Value> = group.blessings
                                                    .iter()
                                                    .map(|(p, d)| Ok((p.as_str(), to_json("blessings", d)?)))
                                                    .collect::<Result<_, MergeError>>()?;
        fields.insert("blessings".to_string(),
                      ProvenancedField::new(to_json("blessings", &blessings)?,
                                            group.blessings.values().map(|d| d.selected.as_str())));

        put_status(&mut fields, group)?;
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::test_support::{group_of, member};
    use mat_domain::{CalculationOutput, TaskType};

    #[test]
    fn relaxed_structure_takes_precedence() {
        let relax = member("mp-1",
                           TaskType::StructureOptimization,
                           1,
                           CalculationOutput { energy: Some(-2.0),
                                               structure: Some(json!({"a": 3.1})),
                                               ..Default::default() });
        let static_run = member("mp-2",
                                TaskType::Static,
                                5,
                                CalculationOutput { energy: Some(-2.1),
                                                    structure: Some(json!({"a": 3.0})),
                                                    ..Default::default() });
        let fields = MaterialsMerge.merge(&group_of(vec![relax, static_run])).unwrap();
        assert_eq!(fields["structure"].value, json!({"a": 3.1}));
        assert_eq!(fields["structure"].sources, vec!["mp-1".to_string()]);
        assert_eq!(fields["energy"].sources, vec!["mp-2".to_string()]);
        assert_eq!(fields["structure_origin"].value, json!("structure"));
    }

    #[test]
    fn missing_structure_fails_the_group() {
        let bare = member("mp-1", TaskType::NscfUniform, 1, CalculationOutput { energy: Some(-1.0), ..Default::default() });
        let err = MaterialsMerge.merge(&group_of(vec![bare])).unwrap_err();
        assert!(matches!(err, MergeError::MissingProperty { property: Property::Structure, .. }));
    }

    #[test]
    fn merge_is_idempotent() {
        let m = member("mp-1",
                       TaskType::Static,
                       1,
                       CalculationOutput { energy: Some(-1.0),
                                           structure: Some(json!({})),
                                           bandgap: Some(0.4),
                                           ..Default::default() });
        let g = group_of(vec![m]);
        assert_eq!(MaterialsMerge.merge(&g).unwrap(), MaterialsMerge.merge(&g).unwrap());
    }
}
