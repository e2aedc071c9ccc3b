use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::CalculationOutput;

/// Propiedades con bendición independiente dentro de un grupo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Energy,
    Structure,
    Magnetism,
    BandGap,
    Dielectric,
}

impl Property {
    pub const ALL: [Property; 5] = [Property::Energy,
                                    Property::Structure,
                                    Property::Magnetism,
                                    Property::BandGap,
                                    Property::Dielectric];

    pub fn as_str(&self) -> &'static str {
        match self {
            Property::Energy => "energy",
            Property::Structure => "structure",
            Property::Magnetism => "magnetism",
            Property::BandGap => "band_gap",
            Property::Dielectric => "dielectric",
        }
    }

    /// `true` si el output trae la propiedad (energías además finitas).
    pub fn is_present(&self, output: &CalculationOutput) -> bool {
        match self {
            Property::Energy => output.energy.map(f64::is_finite).unwrap_or(false),
            Property::Structure => output.structure.as_ref().map(|s| !s.is_null()).unwrap_or(false),
            Property::Magnetism => output.total_magnetization.is_some() || !output.magnetic_moments.is_empty(),
            Property::BandGap => output.bandgap.map(f64::is_finite).unwrap_or(false),
            Property::Dielectric => output.dielectric.as_ref().map(|d| !d.is_null()).unwrap_or(false),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
