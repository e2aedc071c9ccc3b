use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::DomainError;

/// Software que produjo el cálculo; selecciona vocabulario, tabla de reglas
/// y árbol de task types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Software {
    Vasp,
    #[serde(rename = "qchem")]
    QChem,
}

impl Software {
    pub const ALL: [Software; 2] = [Software::Vasp, Software::QChem];

    pub fn as_str(&self) -> &'static str {
        match self {
            Software::Vasp => "vasp",
            Software::QChem => "qchem",
        }
    }
}

impl fmt::Display for Software {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Software {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "").as_str() {
            "vasp" => Ok(Software::Vasp),
            "qchem" => Ok(Software::QChem),
            other => Err(DomainError::UnknownSoftware(other.to_string())),
        }
    }
}
