//! Documento de reglas (forma YAML) y sus fuentes canónicas.
//!
//! El artefacto YAML se regenera siempre desde las listas canónicas de este
//! módulo (`mat-cli gen-rules`); añadir un funcional es un cambio de datos
//! aquí y en el YAML regenerado, nunca de lógica.
use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use mat_domain::Software;

use crate::ConfigError;

pub const RULE_TABLE_VERSION: u32 = 1;

pub const BUNDLED_VASP_RULES: &str = include_str!("../rules/vasp_run_types.yaml");
pub const BUNDLED_QCHEM_RULES: &str = include_str!("../rules/qchem_run_types.yaml");

/// Mapa ordenado que rechaza claves duplicadas al deserializar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StrictMap<V>(pub IndexMap<String, V>);

impl<V> Default for StrictMap<V> {
    fn default() -> Self {
        Self(IndexMap::new())
    }
}

impl<V> StrictMap<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.0.insert(key.into(), value);
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, V> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl<V> FromIterator<(String, V)> for StrictMap<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

struct StrictMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for StrictMapVisitor<V> {
    type Value = StrictMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping with unique keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut map = IndexMap::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((key, value)) = access.next_entry::<String, V>()? {
            if map.contains_key(&key) {
                return Err(serde::de::Error::custom(format!("duplicate key {key:?}")));
            }
            map.insert(key, value);
        }
        Ok(StrictMap(map))
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(StrictMap::default())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for StrictMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(StrictMapVisitor(PhantomData))
    }
}

/// `{when: {PARAM: value}, requires: [PARAM]}`: si `when` coincide y falta
/// alguna clave de `requires` en el input crudo, el run type es
/// `Unrecognized` en vez de adivinar con defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConflictDocument {
    pub when: StrictMap<Value>,
    pub requires: Vec<String>,
}

/// Forma serializada de una tabla de reglas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleTableDocument {
    pub version: u32,
    pub software: Software,
    /// Familias en orden de evaluación.
    pub priority: Vec<String>,
    pub task_types: Vec<String>,
    pub default_tolerance: f64,
    #[serde(default)]
    pub tolerances: StrictMap<f64>,
    #[serde(default)]
    pub conflicts: Vec<ConflictDocument>,
    #[serde(default)]
    pub compatibility: StrictMap<String>,
    /// familia → etiqueta → parámetro → valor requerido
    pub run_types: StrictMap<StrictMap<StrictMap<Value>>>,
}

impl RuleTableDocument {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Literal de las listas canónicas.
#[derive(Clone, Copy)]
enum Lit {
    B(bool),
    F(f64),
    S(&'static str),
}

impl Lit {
    fn to_value(self) -> Value {
        match self {
            Lit::B(b) => Value::Bool(b),
            Lit::F(f) => Value::from(f),
            Lit::S(s) => Value::String(s.to_string()),
        }
    }
}

use Lit::{B, F, S};

type RuleList = &'static [(&'static str, &'static [(&'static str, Lit)])];

const VASP_PRIORITY: &[(&str, RuleList)] = &[
    ("VDW", &[("SCAN-rVV10", &[("BPARAM", F(15.7)), ("GGA", S("--")), ("LUSE_VDW", B(true)), ("METAGGA", S("SCAN"))]),
              ("r2SCAN-rVV10", &[("BPARAM", F(15.7)), ("GGA", S("--")), ("LUSE_VDW", B(true)), ("METAGGA", S("R2SCAN"))]),
              ("vdW-DF", &[("AGGAC", F(0.0)), ("GGA", S("RE")), ("LUSE_VDW", B(true))]),
              ("vdW-DF2", &[("AGGAC", F(0.0)), ("GGA", S("ML")), ("LUSE_VDW", B(true)), ("ZAB_VDW", F(-1.8867))]),
              ("rev-vdW-DF2", &[("AGGAC", F(0.0)),
                                ("GGA", S("MK")),
                                ("LUSE_VDW", B(true)),
                                ("PARAM1", F(0.1234)),
                                ("PARAM2", F(0.711357)),
                                ("ZAB_VDW", F(-1.8867))]),
              ("optPBE", &[("AGGAC", F(0.0)), ("GGA", S("OR")), ("LUSE_VDW", B(true))]),
              ("optB88", &[("AGGAC", F(0.0)), ("GGA", S("BO")), ("LUSE_VDW", B(true)), ("PARAM1", F(0.1833333333)), ("PARAM2", F(0.22))]),
              ("optB86b", &[("AGGAC", F(0.0)), ("GGA", S("MK")), ("LUSE_VDW", B(true)), ("PARAM1", F(0.1234)), ("PARAM2", F(1.0))]),
              ("rVV10", &[("AGGAC", F(0.0)), ("BPARAM", F(6.3)), ("CPARAM", F(0.0093)), ("GGA", S("ML")), ("LUSE_VDW", B(true))])]),
    ("METAGGA", &[("SCAN", &[("LHFCALC", B(false)), ("METAGGA", S("SCAN"))]),
                  ("r2SCAN", &[("LHFCALC", B(false)), ("METAGGA", S("R2SCAN"))]),
                  ("rSCAN", &[("LHFCALC", B(false)), ("METAGGA", S("RSCAN"))]),
                  ("TPSS", &[("LHFCALC", B(false)), ("METAGGA", S("TPSS"))]),
                  ("revTPSS", &[("LHFCALC", B(false)), ("METAGGA", S("RTPSS"))]),
                  ("M06L", &[("LHFCALC", B(false)), ("METAGGA", S("M06L"))]),
                  ("MBJ", &[("LHFCALC", B(false)), ("METAGGA", S("MBJ"))]),
                  ("MS0", &[("LHFCALC", B(false)), ("METAGGA", S("MS0"))]),
                  ("MS1", &[("LHFCALC", B(false)), ("METAGGA", S("MS1"))]),
                  ("MS2", &[("LHFCALC", B(false)), ("METAGGA", S("MS2"))])]),
    ("GGA", &[("GGA", &[("GGA", S("--")), ("LHFCALC", B(false)), ("METAGGA", S("--"))]),
              ("PBE", &[("GGA", S("PE")), ("LHFCALC", B(false)), ("METAGGA", S("--"))]),
              ("PBEsol", &[("GGA", S("PS")), ("LHFCALC", B(false)), ("METAGGA", S("--"))]),
              ("RPBE", &[("GGA", S("RP")), ("LHFCALC", B(false)), ("METAGGA", S("--"))]),
              ("revPBE", &[("GGA", S("RE")), ("LHFCALC", B(false)), ("METAGGA", S("--"))]),
              ("PW91", &[("GGA", S("91")), ("LHFCALC", B(false)), ("METAGGA", S("--"))]),
              ("AM05", &[("GGA", S("AM")), ("LHFCALC", B(false)), ("METAGGA", S("--"))])]),
    ("LDA", &[("LDA", &[("GGA", S("CA")), ("LHFCALC", B(false)), ("METAGGA", S("--"))])]),
    ("HF", &[("HF", &[("AEXX", F(1.0)), ("AGGAC", F(0.0)), ("AGGAX", F(1.0)), ("ALDAC", F(0.0)), ("HFSCREEN", F(0.0)), ("LHFCALC", B(true))]),
             ("PBE0", &[("AEXX", F(0.25)), ("AGGAC", F(1.0)), ("AGGAX", F(0.75)), ("ALDAC", F(1.0)), ("HFSCREEN", F(0.0)), ("LHFCALC", B(true))]),
             ("HSE03", &[("AEXX", F(0.25)), ("AGGAC", F(1.0)), ("AGGAX", F(0.75)), ("ALDAC", F(1.0)), ("HFSCREEN", F(0.3)), ("LHFCALC", B(true))]),
             ("HSE06", &[("AEXX", F(0.25)), ("AGGAC", F(1.0)), ("AGGAX", F(0.75)), ("ALDAC", F(1.0)), ("HFSCREEN", F(0.2)), ("LHFCALC", B(true))]),
             ("B3LYP", &[("AEXX", F(0.2)), ("AGGAC", F(0.81)), ("AGGAX", F(0.72)), ("ALDAC", F(0.19)), ("GGA", S("B3")), ("LHFCALC", B(true))])]),
];

const VASP_TASK_TYPES: &[&str] = &["NSCF Line",
                                   "NSCF Uniform",
                                   "Dielectric",
                                   "DFPT",
                                   "NMR Nuclear Shielding",
                                   "NMR Electric Field Gradient",
                                   "Static",
                                   "Structure Optimization",
                                   "Deformation",
                                   "Optic",
                                   "Molecular Dynamics",
                                   "Unrecognized"];

const VASP_TOLERANCES: &[(&str, f64)] = &[("AEXX", 0.001),
                                          ("AGGAC", 0.001),
                                          ("AGGAX", 0.001),
                                          ("ALDAC", 0.001),
                                          ("HFSCREEN", 0.001),
                                          ("BPARAM", 0.01),
                                          ("CPARAM", 0.0001),
                                          ("PARAM1", 0.0001),
                                          ("PARAM2", 0.0001),
                                          ("ZAB_VDW", 0.0001)];

const VASP_CONFLICTS: &[(&[(&str, Lit)], &[&str])] = &[(&[("LHFCALC", B(true))], &["AEXX"]), (&[("LDAU", B(true))], &["LDAUU"])];

const VASP_COMPATIBILITY: &[(&str, &str)] = &[("PBE", "GGA")];

const QCHEM_PRIORITY: &[(&str, RuleList)] = &[
    ("VDW", &[("B3LYP-D3", &[("DFT_D", S("D3_BJ")), ("METHOD", S("B3LYP"))]),
              ("B97-D3", &[("METHOD", S("B97-D3"))]),
              ("wB97X-D", &[("METHOD", S("wB97X-D"))]),
              ("wB97X-V", &[("METHOD", S("wB97X-V"))]),
              ("wB97M-V", &[("METHOD", S("wB97M-V"))])]),
    ("METAGGA", &[("SCAN", &[("METHOD", S("SCAN"))]),
                  ("r2SCAN", &[("METHOD", S("r2SCAN"))]),
                  ("TPSS", &[("METHOD", S("TPSS"))]),
                  ("M06-L", &[("METHOD", S("M06-L"))])]),
    ("GGA", &[("PBE", &[("METHOD", S("PBE"))]),
              ("BLYP", &[("METHOD", S("BLYP"))]),
              ("B97", &[("METHOD", S("B97"))]),
              ("BP86", &[("METHOD", S("BP86"))])]),
    ("HF", &[("HF", &[("METHOD", S("HF"))]),
             ("B3LYP", &[("METHOD", S("B3LYP"))]),
             ("PBE0", &[("METHOD", S("PBE0"))]),
             ("CAM-B3LYP", &[("METHOD", S("CAM-B3LYP"))]),
             ("M06-2X", &[("METHOD", S("M06-2X"))])]),
];

const QCHEM_TASK_TYPES: &[&str] = &["Static",
                                    "Structure Optimization",
                                    "Frequency Analysis",
                                    "Molecular Dynamics",
                                    "NMR Nuclear Shielding",
                                    "Unrecognized"];

const DEFAULT_TOLERANCE: f64 = 0.001;

fn params_map(params: &[(&str, Lit)]) -> StrictMap<Value> {
    params.iter().map(|(k, v)| (k.to_string(), v.to_value())).collect()
}

fn document(software: Software,
            families: &[(&str, RuleList)],
            task_types: &[&str],
            tolerances: &[(&str, f64)],
            conflicts: &[(&[(&str, Lit)], &[&str])],
            compatibility: &[(&str, &str)])
            -> RuleTableDocument {
    let run_types: StrictMap<StrictMap<StrictMap<Value>>> =
        families.iter()
                .map(|(family, rules)| {
                    let rules: StrictMap<StrictMap<Value>> = rules.iter().map(|(label, params)| (label.to_string(), params_map(params))).collect();
                    (family.to_string(), rules)
                })
                .collect();
    RuleTableDocument { version: RULE_TABLE_VERSION,
                        software,
                        priority: families.iter().map(|(f, _)| f.to_string()).collect(),
                        task_types: task_types.iter().map(|t| t.to_string()).collect(),
                        default_tolerance: DEFAULT_TOLERANCE,
                        tolerances: tolerances.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                        conflicts: conflicts.iter()
                                            .map(|(when, requires)| ConflictDocument { when: params_map(when),
                                                                                       requires: requires.iter().map(|r| r.to_string()).collect() })
                                            .collect(),
                        compatibility: compatibility.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect(),
                        run_types }
}

/// Fuente canónica de la tabla VASP.
pub fn canonical_vasp_source() -> RuleTableDocument {
    document(Software::Vasp,
             VASP_PRIORITY,
             VASP_TASK_TYPES,
             VASP_TOLERANCES,
             VASP_CONFLICTS,
             VASP_COMPATIBILITY)
}

/// Fuente canónica de la tabla Q-Chem.
pub fn canonical_qchem_source() -> RuleTableDocument {
    document(Software::QChem, QCHEM_PRIORITY, QCHEM_TASK_TYPES, &[], &[], &[])
}

pub fn canonical_source(software: Software) -> RuleTableDocument {
    match software {
        Software::Vasp => canonical_vasp_source(),
        Software::QChem => canonical_qchem_source(),
    }
}

pub fn bundled_yaml(software: Software) -> &'static str {
    match software {
        Software::Vasp => BUNDLED_VASP_RULES,
        Software::QChem => BUNDLED_QCHEM_RULES,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_yaml_keys_are_rejected() {
        let text = "version: 1\nsoftware: vasp\npriority: [GGA]\ntask_types: [Static]\ndefault_tolerance: 0.001\n\
                    run_types:\n  GGA:\n    PBE: {GGA: PE}\n    PBE: {GGA: PS}\n";
        let err = RuleTableDocument::from_yaml(text).unwrap_err();
        assert!(err.to_string().contains("duplicate"), "{err}");
    }

    #[test]
    fn unknown_top_level_fields_are_rejected() {
        let text = "version: 1\nsoftware: vasp\npriority: []\ntask_types: []\ndefault_tolerance: 0.001\nrun_types: {}\nextra: 1\n";
        assert!(RuleTableDocument::from_yaml(text).is_err());
    }

    #[test]
    fn generated_yaml_parses_back_to_the_same_document() {
        for sw in Software::ALL {
            let doc = canonical_source(sw);
            let text = doc.to_yaml().expect("serialize");
            assert_eq!(RuleTableDocument::from_yaml(&text).expect("parse"), doc);
        }
    }
}
