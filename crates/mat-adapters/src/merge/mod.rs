//! Estrategias de merge: de un grupo bendecido a los campos de un
//! documento de salida.
//!
//! Contrato: funciones puras e idempotentes. Cada campo declara los
//! `calc_id` que lo aportan; la precedencia entre fuentes está fijada en
//! cada estrategia, nunca en el orden de iteración.
pub mod magnetism;
pub mod materials;
pub mod thermo;

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{json, Value};

use mat_core::{DocumentFields, ProvenancedField};
use mat_domain::{DomainError, Property};
use mat_policies::{EquivalenceGroup, GroupMember};

use crate::MergeError;

pub use magnetism::{magnetic_ordering, MagneticOrdering, MagnetismMerge, MAGNETIC_MOMENT_THRESHOLD};
pub use materials::MaterialsMerge;
pub use thermo::ThermoMerge;

pub trait MergeStrategy: Sync {
    /// Tipo de documento producido.
    fn doc_type(&self) -> &str;
    /// Versión del formato del documento; entra en el digest del procesador.
    fn version(&self) -> &str;
    fn merge(&self, group: &EquivalenceGroup) -> Result<DocumentFields, MergeError>;
}

/// Tipos de documento disponibles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DocKind {
    Materials,
    Thermo,
    Magnetism,
}

impl DocKind {
    pub const ALL: [DocKind; 3] = [DocKind::Materials, DocKind::Thermo, DocKind::Magnetism];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocKind::Materials => materials::DOC_TYPE,
            DocKind::Thermo => thermo::DOC_TYPE,
            DocKind::Magnetism => magnetism::DOC_TYPE,
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocKind::ALL.iter()
                    .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
                    .copied()
                    .ok_or_else(|| DomainError::ValidationError(format!("unknown document type: {s}")))
    }
}

/// Miembro bendecido o error de propiedad requerida.
pub(crate) fn require<'a>(group: &'a EquivalenceGroup, property: Property) -> Result<&'a GroupMember, MergeError> {
    group.blessed(property).ok_or_else(|| MergeError::missing(&group.key, property))
}

pub(crate) fn to_json<T: Serialize>(field: &str, value: &T) -> Result<Value, MergeError> {
    serde_json::to_value(value).map_err(|e| MergeError::Malformed { field: field.to_string(),
                                                                     cause: e.to_string() })
}

/// Inserta un campo con un único origen.
pub(crate) fn put(fields: &mut DocumentFields, name: &str, value: Value, source: &GroupMember) {
    fields.insert(name.to_string(), ProvenancedField::single(value, source.calc_id()));
}

/// Campo derivado de todos los miembros del grupo.
pub(crate) fn put_group(fields: &mut DocumentFields, name: &str, value: Value, group: &EquivalenceGroup) {
    fields.insert(name.to_string(),
                  ProvenancedField::new(value, group.members.iter().map(GroupMember::calc_id)));
}

/// Estado del grupo: propiedades sin bendecir, miembros deprecados y
/// `group_status`.
pub(crate) fn put_status(fields: &mut DocumentFields, group: &EquivalenceGroup) -> Result<(), MergeError> {
    let deprecated = group.deprecated_ids();
    fields.insert("deprecated_calc_ids".to_string(),
                  ProvenancedField::new(json!(deprecated), deprecated.iter().copied()));
    let missing: Vec<&str> = group.missing.iter().map(|p| p.as_str()).collect();
    put_group(fields, "missing_properties", json!(missing), group);
    put_group(fields, "group_status", to_json("group_status", &group.status)?, group);
    Ok(())
}

/// Campos de un grupo sin ninguna propiedad bendecida, común a todos los
/// tipos de documento. El grupo queda marcado como vacío, no como fallo.
pub fn empty_group_fields(group: &EquivalenceGroup) -> Result<DocumentFields, MergeError> {
    let mut fields = DocumentFields::new();
    put_group(&mut fields, "structure_key", json!(group.structure_key.as_str()), group);
    put_group(&mut fields, "run_type_family", json!(group.family), group);
    put_status(&mut fields, group)?;
    Ok(fields)
}


#[cfg(test)]
mod tests {
    use super::*;

    use crate::merge::test_support::{group_of, member};
    use mat_domain::{CalculationOutput, TaskType};
    use mat_policies::GroupStatus;

    #[test]
    fn unconverged_only_group_is_marked_empty() {
        let m = member("z-1",
                       TaskType::Static,
                       1,
                       CalculationOutput { energy: Some(-1.0),
                                           structure: Some(json!({})),
                                           converged_electronic: false,
                                           ..Default::default() });
        let group = group_of(vec![m]);
        assert_eq!(group.status, GroupStatus::Empty);
        let fields = empty_group_fields(&group).unwrap();
        assert_eq!(fields["group_status"].value, json!("Empty"));
        assert_eq!(fields["deprecated_calc_ids"].value, json!(["z-1"]));
        assert_eq!(fields["missing_properties"].value.as_array().map(Vec::len), Some(Property::ALL.len()));
        assert!(!fields.contains_key("structure"));
    }

    #[test]
    fn doc_kinds_parse_case_insensitively() {
        assert_eq!("Thermo".parse::<DocKind>().unwrap(), DocKind::Thermo);
        assert_eq!(" materials ".parse::<DocKind>().unwrap(), DocKind::Materials);
        assert!("xas".parse::<DocKind>().is_err());
    }
}
