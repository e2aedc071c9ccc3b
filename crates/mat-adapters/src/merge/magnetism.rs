//! Documento `magnetism`: momentos del registro bendecido para
//! `Magnetism` y su ordenamiento colineal.
use serde::{Deserialize, Serialize};
use serde_json::json;

use mat_core::DocumentFields;
use mat_domain::Property;
use mat_policies::EquivalenceGroup;

use super::{put, require, to_json, MergeStrategy};
use crate::MergeError;

pub const DOC_TYPE: &str = "magnetism";

/// Por debajo de este valor (μB) un momento de sitio cuenta como nulo.
pub const MAGNETIC_MOMENT_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MagneticOrdering {
    /// No magnético.
    NM,
    /// Ferromagnético.
    FM,
    /// Ferrimagnético.
    FiM,
    /// Antiferromagnético.
    AFM,
}

/// Ordenamiento a partir de momentos de sitio. Sin momentos de sitio se
/// decide sólo con la magnetización total.
pub fn magnetic_ordering(moments: &[f64], total: Option<f64>) -> MagneticOrdering {
    let significant: Vec<f64> = moments.iter().copied().filter(|m| m.abs() >= MAGNETIC_MOMENT_THRESHOLD).collect();
    if moments.is_empty() {
        return match total {
            Some(t) if t.abs() >= MAGNETIC_MOMENT_THRESHOLD => MagneticOrdering::FM,
            _ => MagneticOrdering::NM,
        };
    }
    if significant.is_empty() {
        return MagneticOrdering::NM;
    }
    let up = significant.iter().any(|m| *m > 0.0);
    let down = significant.iter().any(|m| *m < 0.0);
    if !(up && down) {
        return MagneticOrdering::FM;
    }
    let net: f64 = significant.iter().sum();
    if net.abs() < MAGNETIC_MOMENT_THRESHOLD {
        MagneticOrdering::AFM
    } else {
        MagneticOrdering::FiM
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MagnetismMerge;

impl MergeStrategy for MagnetismMerge {
    fn doc_type(&self) -> &str {
        DOC_TYPE
    }

    fn version(&self) -> &str {
        "magnetism-1"
    }

    fn merge(&self, group: &EquivalenceGroup) -> Result<DocumentFields, MergeError> {
        let blessed = require(group, Property::Magnetism)?;
        let output = &blessed.record.output;
        let ordering = magnetic_ordering(&output.magnetic_moments, output.total_magnetization);
        let total = output.total_magnetization.unwrap_or_else(|| output.magnetic_moments.iter().sum());
        let n_magnetic = output.magnetic_moments
                               .iter()
                               .filter(|m| m.abs() >= MAGNETIC_MOMENT_THRESHOLD)
                               .count();

        let mut fields = DocumentFields::new();
        put(&mut fields, "total_magnetization", json!(total), blessed);
        put(&mut fields, "magnetic_moments", json!(output.magnetic_moments), blessed);
        put(&mut fields, "ordering", to_json("ordering", &ordering)?, blessed);
        put(&mut fields, "num_magnetic_sites", json!(n_magnetic), blessed);
        put(&mut fields, "is_magnetic", json!(ordering != MagneticOrdering::NM), blessed);
        Ok(fields)
    }
}
