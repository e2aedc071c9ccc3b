//! Clasificador de calc types.
//!
//! Inmutable tras construirse: se comparte entre workers vía `Arc` sin
//! sincronización. Toda la configuración llega en `ClassifierConfig`; no hay
//! settings globales.
use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use mat_core::hashing::hash_value;
use mat_domain::{CalculationRecord, ClassificationResult, ClassificationStatus, InputParameters, RunType, Software,
                 TaskType};

use crate::matcher::values_match;
use crate::table::{Rule, RuleTable};
use crate::task_type::{task_type, CalcCharacter};
use crate::ConfigError;

/// Overrides de tolerancia numérica. Precedencia por parámetro:
/// `tolerances` > tolerancia por clave de la tabla > `default_tolerance` >
/// `default_tolerance` de la tabla. El override global sólo sustituye al
/// valor por defecto de la tabla.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub default_tolerance: Option<f64>,
    #[serde(default)]
    pub tolerances: BTreeMap<String, f64>,
}

impl ClassifierConfig {
    pub fn with_default_tolerance(mut self, tolerance: f64) -> Self {
        self.default_tolerance = Some(tolerance);
        self
    }

    pub fn with_tolerance(mut self, key: &str, tolerance: f64) -> Self {
        self.tolerances.insert(key.trim().to_ascii_uppercase(), tolerance);
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let entries = self.default_tolerance
                          .iter()
                          .map(|v| ("default_tolerance".to_string(), *v))
                          .chain(self.tolerances.iter().map(|(k, v)| (k.clone(), *v)));
        for (key, value) in entries {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::BadTolerance { key, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    tables: BTreeMap<Software, Arc<RuleTable>>,
    config: ClassifierConfig,
    digest: String,
}

impl Classifier {
    pub fn new<I>(tables: I, config: ClassifierConfig) -> Result<Self, ConfigError>
        where I: IntoIterator<Item = RuleTable>
    {
        config.validate()?;
        let config = ClassifierConfig { tolerances: config.tolerances
                                                          .into_iter()
                                                          .map(|(k, v)| (k.trim().to_ascii_uppercase(), v))
                                                          .collect(),
                                        ..config };
        let tables: BTreeMap<Software, Arc<RuleTable>> = tables.into_iter().map(|t| (t.software(), Arc::new(t))).collect();
        let table_digests: BTreeMap<String, String> =
            tables.iter().map(|(sw, t)| (sw.to_string(), t.digest().to_string())).collect();
        let digest = hash_value(&json!({
            "tables": table_digests,
            "default_tolerance": config.default_tolerance,
            "tolerances": config.tolerances,
        }));
        Ok(Self { tables,
                  config,
                  digest })
    }

    /// Clasificador con las tablas incluidas en el binario.
    pub fn bundled(config: ClassifierConfig) -> Result<Self, ConfigError> {
        let tables = Software::ALL.iter().map(|sw| RuleTable::bundled(*sw)).collect::<Result<Vec<_>, _>>()?;
        Self::new(tables, config)
    }

    pub fn table(&self, software: Software) -> Option<&RuleTable> {
        self.tables.get(&software).map(Arc::as_ref)
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Huella de tablas + configuración de tolerancias.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn tolerance(&self, table: &RuleTable, key: &str) -> f64 {
        self.config
            .tolerances
            .get(key)
            .copied()
            .or_else(|| table.tolerances().get(key).copied())
            .or(self.config.default_tolerance)
            .unwrap_or_else(|| table.default_tolerance())
    }

    fn rule_matches(&self, table: &RuleTable, rule: &Rule, params: &InputParameters) -> bool {
        rule.params.iter().all(|(key, expected)| {
                              params.get(key)
                                    .map(|actual| values_match(expected, actual, self.tolerance(table, key)))
                                    .unwrap_or(false)
                          })
    }

    /// Primer conflicto activo: `when` coincide y falta una clave requerida
    /// en el input crudo.
    fn conflict(&self, table: &RuleTable, params: &InputParameters) -> Option<String> {
        table.conflicts().iter().find_map(|c| {
                                    let active = c.when.iter().all(|(key, expected)| {
                                                                  params.get(key)
                                                                        .map(|a| values_match(expected, a, self.tolerance(table, key)))
                                                                        .unwrap_or(false)
                                                              });
                                    if !active {
                                        return None;
                                    }
                                    c.requires.iter().find(|k| !params.contains(k)).map(|missing| {
                                        let when: Vec<String> = c.when.iter().map(|(k, v)| format!("{k}={v}")).collect();
                                        format!("{} set but {missing} missing", when.join(", "))
                                    })
                                })
    }

    fn hubbard(params: &InputParameters) -> bool {
        params.get_bool("LDAU").unwrap_or(false)
        && params.get_float_list("LDAUU").map(|u| u.iter().any(|x| *x != 0.0)).unwrap_or(false)
    }

    /// Run type de un mapeo de parámetros.
    pub fn run_type(&self, params: &InputParameters) -> (RunType, ClassificationStatus) {
        let software = params.software();
        let Some(table) = self.table(software) else {
            return (RunType::unrecognized(),
                    ClassificationStatus::Unrecognized { reason: format!("no rule table for {software}") });
        };
        if let Some(reason) = self.conflict(table, params) {
            debug!("conflicting parameters: {reason}");
            return (RunType::unrecognized(), ClassificationStatus::Unrecognized { reason });
        }
        for family in table.families() {
            let Some(pos) = family.rules.iter().position(|r| self.rule_matches(table, r, params)) else {
                continue;
            };
            let winner = &family.rules[pos];
            let others: Vec<String> = family.rules[pos + 1..].iter()
                                                             .take_while(|r| r.specificity() == winner.specificity())
                                                             .filter(|r| self.rule_matches(table, r, params))
                                                             .map(|r| r.label.clone())
                                                             .collect();
            let mut run_type = RunType::new(winner.label.clone());
            if software == Software::Vasp && Self::hubbard(params) {
                run_type = run_type.with_hubbard();
            }
            if others.is_empty() {
                return (run_type, ClassificationStatus::Recognized);
            }
            warn!("ambiguous run type in family {}: {} also matches {:?}; keeping {}",
                  family.name, winner.label, others, winner.label);
            let mut candidates = vec![winner.label.clone()];
            candidates.extend(others);
            return (run_type, ClassificationStatus::Ambiguous { candidates });
        }
        (RunType::unrecognized(),
         ClassificationStatus::Unrecognized { reason: "no rule matched".to_string() })
    }

    pub fn task_type(&self, record: &CalculationRecord) -> TaskType {
        task_type(&CalcCharacter::from_record(record))
    }

    /// Clasificación completa de un registro. Determinista y sin errores:
    /// lo no reconocido es un resultado válido.
    pub fn classify(&self, record: &CalculationRecord) -> ClassificationResult {
        let (run_type, status) = self.run_type(&record.input);
        let task = self.task_type(record);
        ClassificationResult::new(run_type, task, status)
    }

    /// Familia de agrupación de un run type según la tabla del software.
    pub fn grouping_family(&self, software: Software, run_type: &RunType) -> Option<String> {
        self.table(software)?.grouping_family(run_type)
    }
}
