//! Documento `thermo`: energía del registro bendecido para `Energy`.
//!
//! La física derivada (energías de formación, diagramas de fases) se
//! calcula fuera; aquí sólo se expone la entrada con su procedencia.
use serde_json::json;

use mat_core::DocumentFields;
use mat_domain::Property;
use mat_policies::EquivalenceGroup;

use super::{put, put_group, require, MergeStrategy};
use crate::MergeError;

pub const DOC_TYPE: &str = "thermo";

#[derive(Debug, Clone, Copy, Default)]
pub struct ThermoMerge;

impl MergeStrategy for ThermoMerge {
    fn doc_type(&self) -> &str {
        DOC_TYPE
    }

    fn version(&self) -> &str {
        "thermo-1"
    }

    fn merge(&self, group: &EquivalenceGroup) -> Result<DocumentFields, MergeError> {
        let blessed = require(group, Property::Energy)?;
        let output = &blessed.record.output;
        let energy = output.energy.ok_or_else(|| MergeError::missing(&group.key, Property::Energy))?;

        let mut fields = DocumentFields::new();
        put(&mut fields, "energy", json!(energy), blessed);
        // energía por átomo: la reportada, o derivada de nsites
        let per_atom = output.energy_per_atom.or_else(|| {
                                                 blessed.record
                                                        .nsites
                                                        .filter(|n| *n > 0)
                                                        .map(|n| energy / f64::from(n))
                                             });
        if let Some(epa) = per_atom {
            put(&mut fields, "energy_per_atom", json!(epa), blessed);
        }
        let run_type = &blessed.classification.run_type;
        put(&mut fields, "run_type", json!(run_type.as_str()), blessed);
        put(&mut fields, "calc_type", json!(blessed.classification.calc_type.as_str()), blessed);
        put(&mut fields,
            "entry_id",
            json!(format!("{}-{}", blessed.calc_id(), run_type)),
            blessed);
        put_group(&mut fields, "structure_key", json!(group.structure_key.as_str()), group);
        Ok(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::test_support::{group_of, member};
    use mat_domain::{CalculationOutput, TaskType};

    #[test]
    fn energy_per_atom_is_derived_from_site_count() {
        let mut m = member("mp-7", TaskType::Static, 2, CalculationOutput { energy: Some(-9.0), ..Default::default() });
        m.record = m.record.with_nsites(3);
        let fields = ThermoMerge.merge(&group_of(vec![m])).unwrap();
        assert_eq!(fields["energy_per_atom"].value, json!(-3.0));
        assert_eq!(fields["entry_id"].value, json!("mp-7-GGA"));
    }

    #[test]
    fn requires_an_energy_blessing() {
        let m = member("mp-7", TaskType::NscfLine, 2, CalculationOutput { energy: Some(-9.0), ..Default::default() });
        assert!(matches!(ThermoMerge.merge(&group_of(vec![m])),
                         Err(MergeError::MissingProperty { property: Property::Energy, .. })));
    }
}
