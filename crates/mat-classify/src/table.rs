//! Tabla de reglas validada e inmutable.
//!
//! Invariantes tras `RuleTable::from_document`:
//! - las familias siguen el orden de `priority`;
//! - dentro de cada familia las reglas van de más a menos específicas
//!   (número de parámetros requeridos) y, a igual especificidad, por
//!   etiqueta;
//! - dos reglas de la misma familia con igual especificidad se contradicen
//!   en al menos un parámetro compartido;
//! - etiquetas únicas en toda la tabla (sin distinguir mayúsculas).
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use log::debug;
use serde_json::{json, Value};

use mat_core::hashing::hash_value;
use mat_domain::calc_types::{HUBBARD_SUFFIX, UNRECOGNIZED};
use mat_domain::{vocabulary, ParamValue, RunType, Software, TaskType, Vocabulary};

use crate::matcher::values_match;
use crate::source::{bundled_yaml, ConflictDocument, RuleTableDocument, StrictMap, RULE_TABLE_VERSION};
use crate::task_type::emitted_task_types;
use crate::ConfigError;

#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub label: String,
    /// Parámetros requeridos, ordenados por clave.
    pub params: BTreeMap<String, ParamValue>,
}

impl Rule {
    pub fn specificity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleFamily {
    pub name: String,
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub when: BTreeMap<String, ParamValue>,
    pub requires: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuleTable {
    software: Software,
    version: u32,
    families: Vec<RuleFamily>,
    task_types: Vec<TaskType>,
    default_tolerance: f64,
    tolerances: BTreeMap<String, f64>,
    conflicts: Vec<Conflict>,
    compatibility: BTreeMap<String, String>,
    /// etiqueta en minúsculas → etiqueta canónica
    labels: BTreeMap<String, String>,
    digest: String,
}

fn check_tolerance(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::BadTolerance { key: key.to_string(), value })
    }
}

/// Valida un mapa `PARAM: valor` contra el vocabulario.
fn typed_params(vocab: &Vocabulary, context: &str, raw: &StrictMap<Value>) -> Result<BTreeMap<String, ParamValue>, ConfigError> {
    let mut out = BTreeMap::new();
    for (key, value) in raw.iter() {
        let norm = key.trim().to_ascii_uppercase();
        let kind = vocab.kind(&norm)
                        .ok_or_else(|| ConfigError::UnknownParameter { context: context.to_string(), key: norm.clone() })?;
        let typed = kind.coerce(&norm, value).map_err(|_| ConfigError::InvalidValue { context: context.to_string(),
                                                                                     key: norm.clone(),
                                                                                     expected: kind.name(),
                                                                                     found: value.to_string() })?;
        if out.insert(norm.clone(), typed).is_some() {
            return Err(ConfigError::DuplicateParameter { context: context.to_string(), key: norm });
        }
    }
    Ok(out)
}

impl RuleTable {
    /// Valida un documento y construye la tabla.
    ///
    /// # Errores
    /// Cualquier violación de integridad devuelve `ConfigError`; no hay
    /// tablas parcialmente válidas.
    pub fn from_document(doc: RuleTableDocument) -> Result<Self, ConfigError> {
        if doc.version != RULE_TABLE_VERSION {
            return Err(ConfigError::UnsupportedVersion(doc.version));
        }
        let vocab = vocabulary(doc.software);

        check_tolerance("default_tolerance", doc.default_tolerance)?;
        let mut tolerances = BTreeMap::new();
        for (key, value) in doc.tolerances.iter() {
            let norm = key.trim().to_ascii_uppercase();
            if !vocab.contains(&norm) {
                return Err(ConfigError::UnknownParameter { context: "tolerances".to_string(), key: norm });
            }
            check_tolerance(&norm, *value)?;
            tolerances.insert(norm, *value);
        }

        // prioridad ↔ familias
        let mut seen_families = BTreeSet::new();
        for family in &doc.priority {
            if !seen_families.insert(family.to_ascii_uppercase()) {
                return Err(ConfigError::DuplicateFamily(family.clone()));
            }
            if !doc.run_types.contains_key(family) {
                return Err(ConfigError::MissingFamily(family.clone()));
            }
        }
        for (family, _) in doc.run_types.iter() {
            if !doc.priority.contains(family) {
                return Err(ConfigError::UnlistedFamily(family.clone()));
            }
        }

        let mut labels = BTreeMap::new();
        let mut families = Vec::with_capacity(doc.priority.len());
        for family in &doc.priority {
            let Some(raw_rules) = doc.run_types.get(family) else {
                return Err(ConfigError::MissingFamily(family.clone()));
            };
            if raw_rules.is_empty() {
                return Err(ConfigError::EmptyRuleSet(family.clone()));
            }
            let mut rules = Vec::with_capacity(raw_rules.len());
            for (label, raw_params) in raw_rules.iter() {
                let label = label.trim().to_string();
                let lower = label.to_ascii_lowercase();
                if label.is_empty()
                   || lower == UNRECOGNIZED.to_ascii_lowercase()
                   || lower.ends_with(&HUBBARD_SUFFIX.to_ascii_lowercase())
                {
                    return Err(ConfigError::InvalidLabel(label));
                }
                if labels.insert(lower, label.clone()).is_some() {
                    return Err(ConfigError::DuplicateLabel { label, family: family.clone() });
                }
                let params = typed_params(vocab, &label, raw_params)?;
                if params.is_empty() {
                    return Err(ConfigError::EmptyRule(label));
                }
                rules.push(Rule { label, params });
            }
            rules.sort_by(|a, b| b.specificity().cmp(&a.specificity()).then_with(|| a.label.cmp(&b.label)));
            families.push(RuleFamily { name: family.clone(), rules });
        }

        let mut task_types = Vec::with_capacity(doc.task_types.len());
        for raw in &doc.task_types {
            let task: TaskType = raw.parse().map_err(|_| ConfigError::UnknownTaskType(raw.clone()))?;
            if task_types.contains(&task) {
                return Err(ConfigError::DuplicateTaskType(task.to_string()));
            }
            task_types.push(task);
        }
        for emitted in emitted_task_types(doc.software) {
            if !task_types.contains(emitted) {
                return Err(ConfigError::MissingTaskType(emitted.to_string()));
            }
        }

        let mut conflicts = Vec::with_capacity(doc.conflicts.len());
        for ConflictDocument { when, requires } in &doc.conflicts {
            let when = typed_params(vocab, "conflicts", when)?;
            if when.is_empty() || requires.is_empty() {
                return Err(ConfigError::BadConflict("conflict needs both `when` and `requires`".to_string()));
            }
            let mut required = Vec::with_capacity(requires.len());
            for key in requires {
                let norm = key.trim().to_ascii_uppercase();
                if !vocab.contains(&norm) {
                    return Err(ConfigError::UnknownParameter { context: "conflicts".to_string(), key: norm });
                }
                required.push(norm);
            }
            conflicts.push(Conflict { when, requires: required });
        }

        let mut compatibility = BTreeMap::new();
        for (from, to) in doc.compatibility.iter() {
            let bad = || ConfigError::BadCompatibility { from: from.clone(), to: to.clone() };
            let from_c = labels.get(&from.trim().to_ascii_lowercase()).cloned().ok_or_else(bad)?;
            let to_c = labels.get(&to.trim().to_ascii_lowercase()).cloned().ok_or_else(bad)?;
            compatibility.insert(from_c, to_c);
        }

        let mut table = Self { software: doc.software,
                               version: doc.version,
                               families,
                               task_types,
                               default_tolerance: doc.default_tolerance,
                               tolerances,
                               conflicts,
                               compatibility,
                               labels,
                               digest: String::new() };
        table.check_ambiguity()?;
        table.digest = table.compute_digest();
        debug!("rule table {} loaded: {} families, {} labels, digest {}",
               table.software,
               table.families.len(),
               table.labels.len(),
               table.digest);
        Ok(table)
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        Self::from_document(RuleTableDocument::from_yaml(text)?)
    }

    /// Carga una tabla desde disco; `expected` protege contra mezclar
    /// archivos de distintos programas.
    pub fn load(path: impl AsRef<Path>, expected: Software) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io { path: path.display().to_string(),
                                                                               cause: e.to_string() })?;
        let table = Self::from_yaml(&text)?;
        if table.software != expected {
            return Err(ConfigError::WrongSoftware { expected: expected.to_string(),
                                                    found: table.software.to_string() });
        }
        Ok(table)
    }

    /// Tabla incluida en el binario para `software`.
    pub fn bundled(software: Software) -> Result<Self, ConfigError> {
        Self::from_yaml(bundled_yaml(software))
    }

    /// Dos reglas de igual especificidad deben contradecirse en algún
    /// parámetro compartido; si no, un mismo input podría coincidir con ambas.
    fn check_ambiguity(&self) -> Result<(), ConfigError> {
        for family in &self.families {
            for (i, a) in family.rules.iter().enumerate() {
                for b in family.rules[i + 1..].iter().take_while(|b| b.specificity() == a.specificity()) {
                    if !self.contradicts(a, b) {
                        return Err(ConfigError::AmbiguousRules { family: family.name.clone(),
                                                                 first: a.label.clone(),
                                                                 second: b.label.clone() });
                    }
                }
            }
        }
        Ok(())
    }

    fn contradicts(&self, a: &Rule, b: &Rule) -> bool {
        a.params.iter().any(|(key, va)| {
                           b.params
                            .get(key)
                            .map(|vb| !values_match(va, vb, self.tolerance(key)))
                            .unwrap_or(false)
                       })
    }

    fn compute_digest(&self) -> String {
        match serde_json::to_value(self.to_document()) {
            Ok(v) => hash_value(&json!({ "rule_table": v })),
            Err(e) => format!("undigestable:{e}"),
        }
    }

    /// Documento canónico: familias por prioridad, reglas por especificidad,
    /// parámetros por clave.
    pub fn to_document(&self) -> RuleTableDocument {
        let run_types = self.families
                            .iter()
                            .map(|f| {
                                let rules: StrictMap<StrictMap<Value>> =
                                    f.rules
                                     .iter()
                                     .map(|r| (r.label.clone(), r.params.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()))
                                     .collect();
                                (f.name.clone(), rules)
                            })
                            .collect();
        RuleTableDocument { version: self.version,
                            software: self.software,
                            priority: self.families.iter().map(|f| f.name.clone()).collect(),
                            task_types: self.task_types.iter().map(|t| t.to_string()).collect(),
                            default_tolerance: self.default_tolerance,
                            tolerances: self.tolerances.iter().map(|(k, v)| (k.clone(), *v)).collect(),
                            conflicts: self.conflicts
                                           .iter()
                                           .map(|c| ConflictDocument { when: c.when.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
                                                                       requires: c.requires.clone() })
                                           .collect(),
                            compatibility: self.compatibility.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                            run_types }
    }

    pub fn software(&self) -> Software {
        self.software
    }

    pub fn families(&self) -> &[RuleFamily] {
        &self.families
    }

    pub fn task_types(&self) -> &[TaskType] {
        &self.task_types
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn default_tolerance(&self) -> f64 {
        self.default_tolerance
    }

    /// Tolerancia de la tabla para `key` (sin overrides de configuración).
    pub fn tolerance(&self, key: &str) -> f64 {
        self.tolerances.get(key).copied().unwrap_or(self.default_tolerance)
    }

    pub fn tolerances(&self) -> &BTreeMap<String, f64> {
        &self.tolerances
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.values().map(String::as_str)
    }

    /// Valida una etiqueta sin distinguir mayúsculas (admite sufijo `+U`) y
    /// devuelve la grafía canónica.
    pub fn canonical_run_type(&self, label: &str) -> Option<RunType> {
        let trimmed = label.trim();
        let lower = trimmed.to_ascii_lowercase();
        let suffix = HUBBARD_SUFFIX.to_ascii_lowercase();
        let (base, hubbard) = match lower.strip_suffix(&suffix) {
            Some(base) => (base.trim_end().to_string(), true),
            None => (lower.clone(), false),
        };
        let canonical = RunType::new(self.labels.get(&base)?.clone());
        Some(if hubbard { canonical.with_hubbard() } else { canonical })
    }

    /// Familia de agrupación: la etiqueta base pasada por `compatibility`
    /// más `+U`. `None` para `Unrecognized` o etiquetas ajenas a la tabla.
    pub fn grouping_family(&self, run_type: &RunType) -> Option<String> {
        if run_type.is_unrecognized() {
            return None;
        }
        let base = self.labels.get(&run_type.base_label().to_ascii_lowercase())?;
        let family = self.compatibility.get(base).unwrap_or(base);
        Some(if run_type.is_hubbard() { format!("{family}{HUBBARD_SUFFIX}") } else { family.clone() })
    }

    pub fn allows_task_type(&self, task: TaskType) -> bool {
        self.task_types.contains(&task)
    }

    /// Hash del contenido canónico; entra en los fingerprints de build.
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::canonical_vasp_source;

    fn doc(yaml: &str) -> RuleTableDocument {
        RuleTableDocument::from_yaml(yaml).expect("yaml")
    }

    const HEADER: &str = "version: 1\nsoftware: qchem\npriority: [GGA]\n\
                          task_types: [Static, Structure Optimization, Frequency Analysis, Molecular Dynamics, \
                          NMR Nuclear Shielding, Unrecognized]\ndefault_tolerance: 0.001\n";

    #[test]
    fn rules_are_ordered_by_specificity_then_label() {
        let table = RuleTable::from_document(canonical_vasp_source()).expect("valid");
        let vdw = &table.families()[0];
        assert_eq!(vdw.name, "VDW");
        assert_eq!(vdw.rules[0].label, "rev-vdW-DF2");
        let specs: Vec<usize> = vdw.rules.iter().map(Rule::specificity).collect();
        let mut sorted = specs.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(specs, sorted);
    }

    #[test]
    fn empty_family_is_rejected() {
        let err = RuleTable::from_yaml(&format!("{HEADER}run_types:\n  GGA: {{}}\n")).unwrap_err();
        assert_eq!(err, ConfigError::EmptyRuleSet("GGA".into()));
    }

    #[test]
    fn duplicate_labels_across_case_are_rejected() {
        let yaml = format!("{HEADER}run_types:\n  GGA:\n    PBE: {{METHOD: PBE}}\n    pbe: {{METHOD: BLYP}}\n");
        assert!(matches!(RuleTable::from_yaml(&yaml), Err(ConfigError::DuplicateLabel { .. })));
    }

    #[test]
    fn unknown_parameters_are_rejected() {
        let yaml = format!("{HEADER}run_types:\n  GGA:\n    PBE: {{FUNCTIONAL: PBE}}\n");
        assert!(matches!(RuleTable::from_yaml(&yaml), Err(ConfigError::UnknownParameter { .. })));
    }

    #[test]
    fn wrong_value_kind_is_rejected() {
        let yaml = format!("{HEADER}run_types:\n  GGA:\n    PBE: {{METHOD: PBE, UNRESTRICTED: often}}\n");
        assert!(matches!(RuleTable::from_yaml(&yaml), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn non_contradicting_rules_of_equal_specificity_are_ambiguous() {
        let yaml = format!("{HEADER}run_types:\n  GGA:\n    PBE: {{METHOD: PBE}}\n    OPEN: {{UNRESTRICTED: true}}\n");
        assert!(matches!(RuleTable::from_yaml(&yaml), Err(ConfigError::AmbiguousRules { .. })));
    }

    #[test]
    fn families_must_match_priority() {
        let yaml = format!("{HEADER}run_types:\n  GGA:\n    PBE: {{METHOD: PBE}}\n  HF:\n    HF: {{METHOD: HF}}\n");
        assert_eq!(RuleTable::from_yaml(&yaml).unwrap_err(), ConfigError::UnlistedFamily("HF".into()));
    }

    #[test]
    fn task_tree_labels_must_be_allowed() {
        let yaml = "version: 1\nsoftware: qchem\npriority: [GGA]\ntask_types: [Static]\ndefault_tolerance: 0.001\n\
                    run_types:\n  GGA:\n    PBE: {METHOD: PBE}\n";
        assert!(matches!(RuleTable::from_yaml(yaml), Err(ConfigError::MissingTaskType(_))));
    }

    #[test]
    fn non_positive_tolerances_are_rejected() {
        let yaml = format!("{HEADER}tolerances: {{SCF_CONVERGENCE: 0}}\nrun_types:\n  GGA:\n    PBE: {{METHOD: PBE}}\n");
        assert!(matches!(RuleTable::from_yaml(&yaml), Err(ConfigError::BadTolerance { .. })));
    }

    #[test]
    fn compatibility_must_reference_known_labels() {
        let yaml = format!("{HEADER}compatibility: {{PBE: GGA}}\nrun_types:\n  GGA:\n    PBE: {{METHOD: PBE}}\n");
        assert!(matches!(RuleTable::from_yaml(&yaml), Err(ConfigError::BadCompatibility { .. })));
    }

    #[test]
    fn canonical_run_type_restores_casing() {
        let table = RuleTable::from_document(canonical_vasp_source()).expect("valid");
        assert_eq!(table.canonical_run_type("R2SCAN").map(|r| r.to_string()), Some("r2SCAN".to_string()));
        assert_eq!(table.canonical_run_type("pbe+u").map(|r| r.to_string()), Some("PBE+U".to_string()));
        assert!(table.canonical_run_type("B97M-V").is_none());
    }

    #[test]
    fn grouping_family_uses_compatibility_map() {
        let table = RuleTable::from_document(canonical_vasp_source()).expect("valid");
        assert_eq!(table.grouping_family(&RunType::new("PBE")), Some("GGA".to_string()));
        assert_eq!(table.grouping_family(&RunType::new("PBE+U")), Some("GGA+U".to_string()));
        assert_eq!(table.grouping_family(&RunType::new("r2SCAN")), Some("r2SCAN".to_string()));
        assert_eq!(table.grouping_family(&RunType::unrecognized()), None);
    }
}
