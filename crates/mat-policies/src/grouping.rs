//! Partición de registros clasificados en grupos de equivalencia.
//!
//! Clave de grupo: `structure_key|familia`, donde la familia es el run type
//! canónico pasado por el mapa de compatibilidad de la tabla, más `+U`. Los
//! registros con run type `Unrecognized` se apartan y se reportan, nunca se
//! agrupan.
use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use mat_classify::Classifier;
use mat_domain::{CalculationRecord, ClassificationResult, ClassificationStatus, StructureKey};

/// Separador entre clave estructural y familia.
pub const GROUP_KEY_SEPARATOR: char = '|';

pub fn group_key(structure_key: &StructureKey, family: &str) -> String {
    format!("{structure_key}{GROUP_KEY_SEPARATOR}{family}")
}

/// Registro junto con su clasificación (derivada, no persistida).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    pub record: CalculationRecord,
    pub classification: ClassificationResult,
}

/// Miembros de un grupo antes de validar y bendecir.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordGroup {
    pub key: String,
    pub structure_key: StructureKey,
    pub family: String,
    /// Ordenados por `calc_id`.
    pub members: Vec<ClassifiedRecord>,
}

/// Registro apartado por no tener run type reconocible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetAside {
    pub calc_id: String,
    pub structure_key: StructureKey,
    pub calc_type: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub groups: BTreeMap<String, RecordGroup>,
    /// Ordenados por `calc_id`.
    pub unrecognized: Vec<SetAside>,
}

impl Partition {
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn record_count(&self) -> usize {
        self.groups.values().map(|g| g.members.len()).sum::<usize>() + self.unrecognized.len()
    }
}

/// Clasifica y particiona. Con `calc_id` repetido gana la versión con marca
/// de modificación más reciente.
pub fn partition<I>(classifier: &Classifier, records: I) -> Partition
    where I: IntoIterator<Item = CalculationRecord>
{
    let mut latest: BTreeMap<String, CalculationRecord> = BTreeMap::new();
    for record in records {
        match latest.get(&record.calc_id) {
            Some(prev) if prev.last_modified() >= record.last_modified() => {
                warn!("duplicate calc_id {}: keeping version from {}", record.calc_id, prev.last_modified());
            }
            Some(_) => {
                warn!("duplicate calc_id {}: keeping version from {}", record.calc_id, record.last_modified());
                latest.insert(record.calc_id.clone(), record);
            }
            None => {
                latest.insert(record.calc_id.clone(), record);
            }
        }
    }

    let mut out = Partition::default();
    // BTreeMap: los miembros quedan ordenados por calc_id al insertarse.
    for (_, record) in latest {
        let classification = classifier.classify(&record);
        let family = classifier.grouping_family(record.software, &classification.run_type);
        let Some(family) = family else {
            let reason = match &classification.status {
                ClassificationStatus::Unrecognized { reason } => reason.clone(),
                _ => format!("run type {} has no grouping family", classification.run_type),
            };
            debug!("setting aside {}: {reason}", record.calc_id);
            out.unrecognized.push(SetAside { calc_id: record.calc_id.clone(),
                                             structure_key: record.structure_key.clone(),
                                             calc_type: classification.calc_type.to_string(),
                                             reason });
            continue;
        };
        let key = group_key(&record.structure_key, &family);
        let group = out.groups.entry(key.clone()).or_insert_with(|| RecordGroup { key,
                                                                                 structure_key: record.structure_key.clone(),
                                                                                 family,
                                                                                 members: Vec::new() });
        group.members.push(ClassifiedRecord { record, classification });
    }
    debug!("partitioned {} records into {} groups ({} set aside)",
           out.record_count(),
           out.groups.len(),
           out.unrecognized.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mat_classify::ClassifierConfig;
    use mat_domain::{InputParameters, Software};
    use serde_json::json;

    fn rec(id: &str, key: &str, raw: serde_json::Value, day: u32) -> CalculationRecord {
        let map = raw.as_object().cloned().unwrap_or_default();
        let input = InputParameters::from_raw(Software::Vasp, map.iter()).unwrap();
        CalculationRecord::new(id,
                               StructureKey::new(key).unwrap(),
                               input,
                               Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()).unwrap()
    }

    #[test]
    fn compatible_run_types_share_a_group() {
        let c = Classifier::bundled(ClassifierConfig::default()).unwrap();
        let p = partition(&c,
                          vec![rec("mp-2", "K", json!({"GGA": "PE"}), 2),
                               rec("mp-1", "K", json!({}), 1),
                               rec("mp-3", "K", json!({"LDAU": true, "LDAUU": [4.0]}), 3),
                               rec("mp-4", "Na", json!({}), 1)]);
        let keys: Vec<&str> = p.groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["K|GGA", "K|GGA+U", "Na|GGA"]);
        let ids: Vec<&str> = p.groups["K|GGA"].members.iter().map(|m| m.record.calc_id.as_str()).collect();
        assert_eq!(ids, vec!["mp-1", "mp-2"]);
    }

    #[test]
    fn unrecognized_records_are_set_aside() {
        let c = Classifier::bundled(ClassifierConfig::default()).unwrap();
        let p = partition(&c, vec![rec("mp-9", "K", json!({"METAGGA": "FOO"}), 1)]);
        assert!(p.groups.is_empty());
        assert_eq!(p.unrecognized.len(), 1);
        assert_eq!(p.unrecognized[0].calc_id, "mp-9");
        assert_eq!(p.record_count(), 1);
    }

    #[test]
    fn newest_duplicate_wins() {
        let c = Classifier::bundled(ClassifierConfig::default()).unwrap();
        let p = partition(&c,
                          vec![rec("mp-1", "K", json!({}), 1), rec("mp-1", "K", json!({"METAGGA": "SCAN"}), 5)]);
        assert_eq!(p.groups.keys().collect::<Vec<_>>(), vec!["K|SCAN"]);
    }
}
