use chrono::{TimeZone, Utc};
use serde_json::json;

use mat_classify::{canonical_source, Classifier, ClassifierConfig, ConfigError, RuleTable, RuleTableDocument};
use mat_domain::{CalculationRecord, ClassificationStatus, InputParameters, KpointSettings, Software, StructureKey,
                 TaskType};

fn record(id: &str, software: Software, raw: serde_json::Value) -> CalculationRecord {
    let map = raw.as_object().cloned().unwrap_or_default();
    let input = InputParameters::from_raw(software, map.iter()).expect("valid input");
    let key = StructureKey::from_parts("K1", "Im-3m").unwrap();
    CalculationRecord::new(id, key, input, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()).unwrap()
}

#[test]
fn bundled_tables_match_canonical_sources() {
    for sw in Software::ALL {
        let bundled = RuleTable::bundled(sw).expect("bundled table loads");
        let canonical = RuleTable::from_document(canonical_source(sw)).expect("canonical table is valid");
        assert_eq!(bundled, canonical, "bundled {sw} table is stale; regenerate it");
        assert_eq!(bundled.digest(), canonical.digest());
    }
}

#[test]
fn regenerated_yaml_loads_to_the_same_table() {
    let doc = canonical_source(Software::Vasp);
    let text = doc.to_yaml().unwrap();
    let reloaded = RuleTable::from_document(RuleTableDocument::from_yaml(&text).unwrap()).unwrap();
    assert_eq!(reloaded, RuleTable::bundled(Software::Vasp).unwrap());
}

#[test]
fn classification_is_deterministic() {
    let a = Classifier::bundled(ClassifierConfig::default()).unwrap();
    let b = Classifier::bundled(ClassifierConfig::default()).unwrap();
    assert_eq!(a.digest(), b.digest());
    let r = record("mp-1", Software::Vasp, json!({"GGA": "PE", "NSW": 0}));
    for _ in 0..5 {
        assert_eq!(a.classify(&r), b.classify(&r));
    }
}

#[test]
fn full_vasp_records_get_calc_types() {
    let c = Classifier::bundled(ClassifierConfig::default()).unwrap();

    let static_run = c.classify(&record("mp-1", Software::Vasp, json!({"GGA": "PE", "NSW": 0})));
    assert_eq!(static_run.calc_type.as_str(), "PBE Static");
    assert!(static_run.is_recognized());

    let relax = c.classify(&record("mp-2", Software::Vasp, json!({"METAGGA": "R2SCAN", "IBRION": 2, "NSW": 99, "ISIF": 3})));
    assert_eq!(relax.calc_type.as_str(), "r2SCAN Structure Optimization");

    let bands = record("mp-3", Software::Vasp, json!({"GGA": "PE", "ICHARG": 11})).with_kpoints(KpointSettings {
        mode: Some("line".into()),
        labels: vec!["\\Gamma".into(), "X".into()],
    });
    assert_eq!(c.classify(&bands).task_type, TaskType::NscfLine);

    let hubbard = c.classify(&record("mp-4", Software::Vasp, json!({"LDAU": true, "LDAUU": [0, 5.3], "NSW": 0})));
    assert_eq!(hubbard.calc_type.as_str(), "GGA+U Static");
}

#[test]
fn unrecognized_run_type_still_gets_a_task_type() {
    let c = Classifier::bundled(ClassifierConfig::default()).unwrap();
    let result = c.classify(&record("mp-5", Software::Vasp, json!({"METAGGA": "FOO", "LEPSILON": true})));
    assert!(result.run_type.is_unrecognized());
    assert_eq!(result.task_type, TaskType::Dielectric);
    assert_eq!(result.calc_type.as_str(), "Unrecognized Dielectric");
    assert!(matches!(result.status, ClassificationStatus::Unrecognized { .. }));
}

#[test]
fn qchem_dispersion_variant_has_priority() {
    let c = Classifier::bundled(ClassifierConfig::default()).unwrap();
    let d3 = c.classify(&record("qc-1", Software::QChem, json!({"METHOD": "b3lyp", "DFT_D": "D3_BJ", "JOB_TYPE": "opt"})));
    assert_eq!(d3.calc_type.as_str(), "B3LYP-D3 Structure Optimization");
    let plain = c.classify(&record("qc-2", Software::QChem, json!({"METHOD": "B3LYP"})));
    assert_eq!(plain.calc_type.as_str(), "B3LYP Static");
    assert_eq!(c.grouping_family(Software::QChem, &plain.run_type), Some("B3LYP".to_string()));
}

#[test]
fn tables_load_from_disk_and_check_software() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("qchem.yaml");
    std::fs::write(&path, canonical_source(Software::QChem).to_yaml().unwrap()).unwrap();

    let table = RuleTable::load(&path, Software::QChem).expect("loads");
    assert_eq!(table.software(), Software::QChem);

    let err = RuleTable::load(&path, Software::Vasp).unwrap_err();
    assert!(matches!(err, ConfigError::WrongSoftware { .. }));

    let missing = RuleTable::load(dir.path().join("nope.yaml"), Software::Vasp).unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}

#[test]
fn invalid_tolerance_overrides_are_rejected() {
    let err = Classifier::bundled(ClassifierConfig::default().with_tolerance("AEXX", -1.0)).unwrap_err();
    assert!(matches!(err, ConfigError::BadTolerance { .. }));
}
