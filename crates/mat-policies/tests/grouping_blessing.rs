use chrono::{TimeZone, Utc};
use serde_json::json;

use mat_classify::{Classifier, ClassifierConfig};
use mat_domain::{CalculationOutput, CalculationRecord, InputParameters, Property, RecordState, Software, StructureKey};
use mat_policies::{partition, BlessingParams, EquivalenceGroup, GroupStatus, QualityRankPolicy};

fn record(id: &str, raw: serde_json::Value, day: u32, output: CalculationOutput) -> CalculationRecord {
    let map = raw.as_object().cloned().unwrap_or_default();
    let input = InputParameters::from_raw(Software::Vasp, map.iter()).unwrap();
    CalculationRecord::new(id,
                           StructureKey::new("K").unwrap(),
                           input,
                           Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap()).unwrap()
                                                                                 .with_output(output)
}

fn energy(e: f64) -> CalculationOutput {
    CalculationOutput { energy: Some(e),
                        structure: Some(json!({"sites": 2})),
                        ..Default::default() }
}

fn assemble_all(records: Vec<CalculationRecord>) -> Vec<EquivalenceGroup> {
    let classifier = Classifier::bundled(ClassifierConfig::default()).unwrap();
    let policy = QualityRankPolicy::new();
    let params = BlessingParams::default();
    partition(&classifier, records).groups
                                   .into_values()
                                   .map(|g| EquivalenceGroup::assemble(g, &policy, &params))
                                   .collect()
}

#[test]
fn gga_and_gga_plus_u_form_separate_groups() {
    let groups = assemble_all(vec![record("k-1", json!({"GGA": "PE"}), 1, energy(-3.0)),
                                   record("k-2", json!({}), 4, energy(-3.1)),
                                   record("k-3", json!({"LDAU": true, "LDAUU": [2.0]}), 2, energy(-2.5))]);
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].key, "K|GGA");
    assert_eq!(groups[0].blessed(Property::Energy).map(|m| m.calc_id()), Some("k-2"));
    assert_eq!(groups[1].key, "K|GGA+U");
    assert_eq!(groups[1].members.len(), 1);
    assert_eq!(groups[1].blessed(Property::Energy).map(|m| m.calc_id()), Some("k-3"));
}

#[test]
fn blessing_is_stable_across_input_orders() {
    let a = vec![record("k-1", json!({}), 3, energy(-3.0)), record("k-2", json!({}), 3, energy(-3.1))];
    let mut b = a.clone();
    b.reverse();
    assert_eq!(assemble_all(a), assemble_all(b));
}

#[test]
fn group_without_valid_members_is_empty_not_an_error() {
    let broken = CalculationOutput { energy: Some(-1.0),
                                     converged_electronic: false,
                                     ..Default::default() };
    let groups = assemble_all(vec![record("k-1", json!({}), 1, broken)]);
    assert_eq!(groups[0].status, GroupStatus::Empty);
    assert!(matches!(groups[0].members[0].state, RecordState::Deprecated { .. }));
    assert_eq!(groups[0].deprecated_ids(), vec!["k-1"]);
    assert_eq!(groups[0].missing.len(), Property::ALL.len());
}

#[test]
fn missing_properties_leave_the_group_partial() {
    let groups = assemble_all(vec![record("k-1", json!({}), 1, energy(-3.0))]);
    let g = &groups[0];
    assert_eq!(g.status, GroupStatus::Partial);
    assert!(g.is_missing(Property::BandGap));
    assert!(g.is_missing(Property::Magnetism));
    assert!(!g.is_missing(Property::Structure));
}
