//! Registro de cálculo terminado (inmutable).
//!
//! Las correcciones llegan como registros nuevos, nunca como ediciones. El
//! registro se serializa en forma plana (`RawCalculationRecord`) y se valida
//! al deserializar, de modo que un `CalculationRecord` en memoria siempre
//! tiene parámetros tipados.
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::InputParameters;
use crate::{DomainError, Software};

/// Clave de identidad estructural (composición + simetría).
///
/// No puede contener `|`, que separa la clave de la familia en las claves de
/// grupo.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StructureKey(String);

impl StructureKey {
    pub fn new(raw: impl Into<String>) -> Result<Self, DomainError> {
        let raw = raw.into();
        let key = raw.trim();
        if key.is_empty() {
            return Err(DomainError::ValidationError("structure key cannot be empty".to_string()));
        }
        if key.contains('|') {
            return Err(DomainError::ValidationError(format!("structure key cannot contain '|': {key}")));
        }
        Ok(Self(key.to_string()))
    }

    /// `composition:symmetry`, p. ej. `K1:Im-3m`.
    pub fn from_parts(composition: &str, symmetry: &str) -> Result<Self, DomainError> {
        Self::new(format!("{}:{}", composition.trim(), symmetry.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for StructureKey {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StructureKey> for String {
    fn from(key: StructureKey) -> Self {
        key.0
    }
}

impl fmt::Display for StructureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Configuración de k-points relevante para distinguir NSCF line/uniform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KpointSettings {
    /// `line`, `automatic`, `gamma`, `reciprocal`...
    #[serde(default)]
    pub mode: Option<String>,
    /// Etiquetas de puntos de alta simetría (sólo en caminos de bandas).
    #[serde(default)]
    pub labels: Vec<String>,
}

impl KpointSettings {
    pub fn is_line_mode(&self) -> bool {
        let line = self.mode
                       .as_deref()
                       .map(|m| m.trim().eq_ignore_ascii_case("line") || m.trim().eq_ignore_ascii_case("line_mode"))
                       .unwrap_or(false);
        line || self.labels.iter().any(|l| !l.trim().is_empty())
    }
}

fn converged_default() -> bool {
    true
}

/// Resultados tipados de un cálculo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculationOutput {
    #[serde(default)]
    pub energy: Option<f64>,
    #[serde(default)]
    pub energy_per_atom: Option<f64>,
    #[serde(default = "converged_default")]
    pub converged_electronic: bool,
    #[serde(default = "converged_default")]
    pub converged_ionic: bool,
    #[serde(default)]
    pub structure: Option<Value>,
    #[serde(default)]
    pub magnetic_moments: Vec<f64>,
    #[serde(default)]
    pub total_magnetization: Option<f64>,
    #[serde(default)]
    pub bandgap: Option<f64>,
    #[serde(default)]
    pub dielectric: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for CalculationOutput {
    fn default() -> Self {
        Self { energy: None,
               energy_per_atom: None,
               converged_electronic: true,
               converged_ionic: true,
               structure: None,
               magnetic_moments: Vec::new(),
               total_magnetization: None,
               bandgap: None,
               dielectric: None,
               extra: BTreeMap::new() }
    }
}

/// Forma plana de serialización de un `CalculationRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCalculationRecord {
    pub calc_id: String,
    pub structure_key: String,
    pub software: Software,
    #[serde(default)]
    pub input: BTreeMap<String, Value>,
    #[serde(default)]
    pub output: CalculationOutput,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpoints: Option<KpointSettings>,
    pub completed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nsites: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCalculationRecord", into = "RawCalculationRecord")]
pub struct CalculationRecord {
    pub calc_id: String,
    pub structure_key: StructureKey,
    pub software: Software,
    pub input: InputParameters,
    pub output: CalculationOutput,
    pub kpoints: Option<KpointSettings>,
    pub completed_at: DateTime<Utc>,
    pub last_updated: Option<DateTime<Utc>>,
    pub nsites: Option<u32>,
    pub formula: Option<String>,
}

impl CalculationRecord {
    /// Registro mínimo; el resto de campos se completa con los `with_*`.
    pub fn new(calc_id: impl Into<String>,
               structure_key: StructureKey,
               input: InputParameters,
               completed_at: DateTime<Utc>)
               -> Result<Self, DomainError> {
        let calc_id = calc_id.into();
        if calc_id.trim().is_empty() {
            return Err(DomainError::ValidationError("calc_id cannot be empty".to_string()));
        }
        Ok(Self { calc_id,
                  structure_key,
                  software: input.software(),
                  input,
                  output: CalculationOutput::default(),
                  kpoints: None,
                  completed_at,
                  last_updated: None,
                  nsites: None,
                  formula: None })
    }

    pub fn with_output(mut self, output: CalculationOutput) -> Self {
        self.output = output;
        self
    }

    pub fn with_kpoints(mut self, kpoints: KpointSettings) -> Self {
        self.kpoints = Some(kpoints);
        self
    }

    pub fn with_nsites(mut self, nsites: u32) -> Self {
        self.nsites = Some(nsites);
        self
    }

    pub fn with_last_updated(mut self, ts: DateTime<Utc>) -> Self {
        self.last_updated = Some(ts);
        self
    }

    /// Marca de última modificación (entra en el fingerprint del grupo).
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_updated.unwrap_or(self.completed_at)
    }

    pub fn is_line_mode(&self) -> bool {
        self.kpoints.as_ref().map(KpointSettings::is_line_mode).unwrap_or(false)
    }
}

impl TryFrom<RawCalculationRecord> for CalculationRecord {
    type Error = DomainError;

    fn try_from(raw: RawCalculationRecord) -> Result<Self, Self::Error> {
        let structure_key = StructureKey::new(raw.structure_key)?;
        let input = InputParameters::from_raw(raw.software, raw.input.iter())?;
        let record = CalculationRecord::new(raw.calc_id, structure_key, input, raw.completed_at)?;
        Ok(Self { output: raw.output,
                  kpoints: raw.kpoints,
                  last_updated: raw.last_updated,
                  nsites: raw.nsites,
                  formula: raw.formula,
                  ..record })
    }
}

impl From<CalculationRecord> for RawCalculationRecord {
    fn from(record: CalculationRecord) -> Self {
        Self { calc_id: record.calc_id,
               structure_key: record.structure_key.into(),
               software: record.software,
               input: record.input.to_raw(),
               output: record.output,
               kpoints: record.kpoints,
               completed_at: record.completed_at,
               last_updated: record.last_updated,
               nsites: record.nsites,
               formula: record.formula }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_record_is_validated_on_deserialize() {
        let ok = json!({
            "calc_id": "mp-1", "structure_key": "K:Im-3m", "software": "vasp",
            "input": {"gga": "PE", "nsw": 0}, "completed_at": "2024-01-01T00:00:00Z",
            "output": {"energy": -1.1, "band_source": "x"}
        });
        let rec: CalculationRecord = serde_json::from_value(ok).expect("valid record");
        assert_eq!(rec.input.get_str("GGA"), Some("PE"));
        assert_eq!(rec.output.extra.get("band_source"), Some(&json!("x")));
        assert!(rec.output.converged_electronic);

        let bad = json!({
            "calc_id": "mp-2", "structure_key": "K|x", "software": "vasp",
            "completed_at": "2024-01-01T00:00:00Z"
        });
        assert!(serde_json::from_value::<CalculationRecord>(bad).is_err());
    }

    #[test]
    fn last_modified_defaults_to_completion() {
        let raw = json!({
            "calc_id": "mp-3", "structure_key": "K", "software": "vasp",
            "completed_at": "2024-01-01T00:00:00Z"
        });
        let rec: CalculationRecord = serde_json::from_value(raw).expect("valid");
        assert_eq!(rec.last_modified(), rec.completed_at);
    }

    #[test]
    fn line_mode_from_labels_or_mode() {
        assert!(KpointSettings { mode: Some("Line".into()), labels: vec![] }.is_line_mode());
        assert!(KpointSettings { mode: None, labels: vec!["\\Gamma".into()] }.is_line_mode());
        assert!(!KpointSettings { mode: Some("automatic".into()), labels: vec![] }.is_line_mode());
    }
}
