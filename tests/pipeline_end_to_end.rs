use chrono::{TimeZone, Utc};
use serde_json::json;

use matflow_rust::mat_adapters::{DocKind, InMemoryCalculationSource};
use matflow_rust::mat_classify::ClassifierConfig;
use matflow_rust::mat_core::{BuildOrchestrator, BuildStateStore, DocumentStore};
use matflow_rust::mat_domain::{CalculationOutput, CalculationRecord, InputParameters, Software, StructureKey};
use matflow_rust::mat_persistence::{file_orchestrator, JsonRecordStore, StoreConfig};
use matflow_rust::MaterialsPipeline;

fn record(id: &str, key: &str, raw: serde_json::Value, day: u32, output: CalculationOutput) -> CalculationRecord {
    let input = InputParameters::from_raw(Software::Vasp, raw.as_object().cloned().unwrap_or_default().iter()).unwrap();
    CalculationRecord::new(id,
                           StructureKey::new(key).unwrap(),
                           input,
                           Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()).unwrap()
                                                                                 .with_nsites(2)
                                                                                 .with_output(output)
}

fn full(energy: f64) -> CalculationOutput {
    CalculationOutput { energy: Some(energy),
                        structure: Some(json!({"lattice": [[5.2, 0, 0], [0, 5.2, 0], [0, 0, 5.2]]})),
                        magnetic_moments: vec![0.0, 0.0],
                        ..Default::default() }
}

fn k_scenario() -> Vec<CalculationRecord> {
    vec![record("k-1", "K", json!({"GGA": "PE"}), 1, full(-2.0)),
         record("k-2", "K", json!({"GGA": "PE"}), 4, full(-2.1)),
         record("k-3", "K", json!({"GGA": "PE", "LDAU": true, "LDAUU": [2.0]}), 2, full(-1.5))]
}

fn pipeline() -> MaterialsPipeline {
    MaterialsPipeline::new(ClassifierConfig::default()).unwrap()
}

#[test]
fn three_k_records_give_two_groups_per_document_type() {
    let source = InMemoryCalculationSource::from_records(k_scenario());
    let mut orch = BuildOrchestrator::in_memory().build();
    let run = pipeline().build(&mut orch, &source, &DocKind::ALL).unwrap();

    assert_eq!(run.reports.len(), 3);
    for report in &run.reports {
        assert_eq!(report.processed, 2, "{}", report.doc_type);
        assert_eq!(report.failed, 0);
    }
    let materials = orch.documents().find("materials").unwrap();
    assert_eq!(materials.iter().map(|d| d.group_key.as_str()).collect::<Vec<_>>(), vec!["K|GGA", "K|GGA+U"]);
    assert_eq!(materials[0].field("energy").unwrap().sources, vec!["k-2".to_string()]);
    assert_eq!(materials[1].field("energy").unwrap().sources, vec!["k-3".to_string()]);

    let thermo = orch.documents().get("thermo", "K|GGA").unwrap().unwrap();
    assert_eq!(thermo.field("energy_per_atom").unwrap().value, json!(-1.05));
    let magnetism = orch.documents().get("magnetism", "K|GGA+U").unwrap().unwrap();
    assert_eq!(magnetism.field("ordering").unwrap().value, json!("NM"));
}

#[test]
fn rerun_is_a_noop_with_byte_identical_documents() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::new(dir.path());
    let records = JsonRecordStore::open(dir.path());
    records.ingest(k_scenario()).unwrap();
    let pipeline = pipeline();

    let mut first = file_orchestrator(&config).unwrap().build();
    pipeline.build(&mut first, &records, &DocKind::ALL).unwrap();
    let before = std::fs::read_to_string(dir.path().join("documents/materials.json")).unwrap();

    let mut second = file_orchestrator(&config).unwrap().build();
    let run = pipeline.build(&mut second, &records, &DocKind::ALL).unwrap();
    assert!(run.reports.iter().all(|r| r.dirty() == 0 && r.skipped_unchanged == 2));
    let after = std::fs::read_to_string(dir.path().join("documents/materials.json")).unwrap();
    assert_eq!(before, after);
}

#[test]
fn failed_group_keeps_its_build_state_and_is_retried() {
    let no_structure = CalculationOutput { energy: Some(-3.0),
                                           ..Default::default() };
    let mut records = k_scenario();
    records.push(record("x-1", "X", json!({}), 1, no_structure));
    let source = InMemoryCalculationSource::from_records(records);
    let pipeline = pipeline();
    let mut orch = BuildOrchestrator::in_memory().build();

    let run = pipeline.build(&mut orch, &source, &[DocKind::Materials, DocKind::Thermo]).unwrap();
    assert_eq!(run.reports[0].processed, 2);
    assert_eq!(run.reports[0].failed_keys(), vec!["X|GGA"]);
    assert!(run.reports[0].failures[0].cause.contains("structure"));
    // thermo sólo necesita energía: el mismo grupo sí se construye
    assert_eq!(run.reports[1].processed, 3);
    assert!(orch.state_store().get("materials", "X|GGA").is_none());

    let retry = pipeline.build(&mut orch, &source, &[DocKind::Materials]).unwrap();
    assert_eq!(retry.reports[0].failed, 1);
    assert_eq!(retry.reports[0].skipped_unchanged, 2);

    source.insert(record("x-2", "X", json!({}), 6, full(-3.1)));
    let fixed = pipeline.build(&mut orch, &source, &[DocKind::Materials]).unwrap();
    assert_eq!(fixed.reports[0].committed_keys, vec!["X|GGA".to_string()]);
    assert_eq!(fixed.failed(), 0);
}

#[test]
fn parallel_and_sequential_builds_agree() {
    let mut records = k_scenario();
    for (i, key) in ["Na", "Rb", "Cs", "Li"].iter().enumerate() {
        records.push(record(&format!("{key}-1"), key, json!({}), 1 + i as u32, full(-1.0 - i as f64)));
    }
    let source = InMemoryCalculationSource::from_records(records);
    let pipeline = pipeline();

    let mut par = BuildOrchestrator::in_memory().build();
    let mut seq = BuildOrchestrator::in_memory().sequential().build();
    pipeline.build(&mut par, &source, &DocKind::ALL).unwrap();
    pipeline.build(&mut seq, &source, &DocKind::ALL).unwrap();
    for kind in DocKind::ALL {
        assert_eq!(par.documents().find(kind.as_str()).unwrap(),
                   seq.documents().find(kind.as_str()).unwrap());
    }
}

#[test]
fn chunked_passes_defer_the_rest_and_force_rebuilds_everything() {
    let source = InMemoryCalculationSource::from_records(k_scenario());
    let pipeline = pipeline();
    let mut orch = BuildOrchestrator::in_memory().chunk_size(1).build();

    let first = pipeline.build(&mut orch, &source, &[DocKind::Thermo]).unwrap();
    assert_eq!((first.reports[0].processed, first.reports[0].deferred), (1, 1));
    let second = pipeline.build(&mut orch, &source, &[DocKind::Thermo]).unwrap();
    assert_eq!((second.reports[0].processed, second.reports[0].deferred), (1, 0));
    assert_eq!(orch.state_store().entries("thermo").unwrap().len(), 2);

    let mut forced = BuildOrchestrator::in_memory().force_full_rebuild(true).build();
    pipeline.build(&mut forced, &source, &[DocKind::Thermo]).unwrap();
    let before = serde_json::to_string(&forced.documents().find("thermo").unwrap()).unwrap();
    let again = pipeline.build(&mut forced, &source, &[DocKind::Thermo]).unwrap();
    assert_eq!(again.reports[0].processed, 2);
    assert_eq!(serde_json::to_string(&forced.documents().find("thermo").unwrap()).unwrap(), before);
}

#[test]
fn forced_chunked_rebuild_reaches_every_group() {
    let source = InMemoryCalculationSource::from_records(k_scenario());
    let pipeline = pipeline();
    let mut orch = BuildOrchestrator::in_memory().chunk_size(1).force_full_rebuild(true).build();

    let mut committed = Vec::new();
    for _ in 0..4 {
        let run = pipeline.build(&mut orch, &source, &[DocKind::Thermo]).unwrap();
        assert_eq!((run.reports[0].processed, run.reports[0].deferred), (1, 1));
        committed.extend(run.reports[0].committed_keys.clone());
    }
    assert_eq!(committed, vec!["K|GGA", "K|GGA+U", "K|GGA", "K|GGA+U"]);
}

#[test]
fn later_runs_report_structures_touched_since_the_last_build() {
    let source = InMemoryCalculationSource::from_records(k_scenario());
    let pipeline = pipeline();
    let mut orch = BuildOrchestrator::in_memory().build();

    let first = pipeline.build(&mut orch, &source, &[DocKind::Thermo]).unwrap();
    assert!(first.touched_structures.is_empty());

    source.insert(record("na-1", "Na", json!({}), 9, full(-1.3)));
    let second = pipeline.build(&mut orch, &source, &[DocKind::Thermo, DocKind::Magnetism]).unwrap();
    assert_eq!(second.touched_structures["thermo"], vec![StructureKey::new("Na").unwrap()]);
    assert!(!second.touched_structures.contains_key("magnetism"));
}

#[test]
fn tolerance_override_dirties_every_group() {
    let source = InMemoryCalculationSource::from_records(k_scenario());
    let mut orch = BuildOrchestrator::in_memory().build();
    pipeline().build(&mut orch, &source, &[DocKind::Materials]).unwrap();

    let strict = MaterialsPipeline::new(ClassifierConfig::default().with_default_tolerance(1e-8)).unwrap();
    let run = strict.build(&mut orch, &source, &[DocKind::Materials]).unwrap();
    assert_eq!(run.reports[0].processed, 2);
    assert_eq!(run.reports[0].skipped_unchanged, 0);
}
