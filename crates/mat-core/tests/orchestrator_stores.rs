//! Comportamiento del orquestador ante stores que fallan.
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{TimeZone, Utc};
use mat_core::{BuildError, BuildEventKind, BuildOrchestrator, BuildStateEntry, BuildStateStore, BuildUnit,
               DocumentFields, GroupProcessingFailure, InMemoryBuildStateStore, InMemoryDocumentStore,
               InMemoryEventStore, InputMarker, ProvenancedField, RetryPolicy, StoreError, UnitProcessor};
use serde_json::json;

struct EchoProcessor;

impl UnitProcessor<i64> for EchoProcessor {
    fn doc_type(&self) -> &str {
        "echo"
    }
    fn digest(&self) -> String {
        "echo-v1".into()
    }
    fn process(&self, unit: &BuildUnit<i64>) -> Result<DocumentFields, GroupProcessingFailure> {
        let mut fields = DocumentFields::new();
        fields.insert("payload".into(), ProvenancedField::single(json!(unit.payload), unit.key.clone()));
        Ok(fields)
    }
}

/// BuildState que falla de forma transitoria las primeras `failures` escrituras.
#[derive(Default)]
struct FlakyStateStore {
    inner: InMemoryBuildStateStore,
    failures: u32,
    attempts: AtomicU32,
}

impl BuildStateStore for FlakyStateStore {
    fn entries(&self, doc_type: &str) -> Result<Vec<BuildStateEntry>, StoreError> {
        self.inner.entries(doc_type)
    }
    fn upsert(&self, entry: BuildStateEntry) -> Result<(), StoreError> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(StoreError::Unavailable(format!("attempt {n}")));
        }
        self.inner.upsert(entry)
    }
    fn remove(&self, doc_type: &str, group_key: &str) -> Result<(), StoreError> {
        self.inner.remove(doc_type, group_key)
    }
}

fn units() -> Vec<BuildUnit<i64>> {
    let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    vec![BuildUnit::new("g1", vec![InputMarker { id: "c1".into(), last_modified: ts }], 1),
         BuildUnit::new("g2", vec![InputMarker { id: "c2".into(), last_modified: ts }], 2)]
}

#[test]
fn transient_store_failures_are_retried() {
    let state = FlakyStateStore { failures: 2, ..Default::default() };
    let mut orch = BuildOrchestrator::builder(InMemoryDocumentStore::new(), state, InMemoryEventStore::default())
        .retry(RetryPolicy::immediate(3))
        .sequential()
        .build();
    let report = orch.run_pass(&EchoProcessor, units()).expect("pass should survive transient errors");
    assert_eq!(report.processed, 2);
    assert_eq!(orch.state_store().inner.len(), 2);
}

#[test]
fn exhausted_retries_abort_the_pass() {
    let state = FlakyStateStore { failures: u32::MAX, ..Default::default() };
    let mut orch = BuildOrchestrator::builder(InMemoryDocumentStore::new(), state, InMemoryEventStore::default())
        .retry(RetryPolicy::immediate(2))
        .sequential()
        .build();
    let err = orch.run_pass(&EchoProcessor, units()).unwrap_err();
    assert!(matches!(err, BuildError::StoreUnavailable { attempts: 2, .. }));

    // El documento del primer grupo quedó escrito pero su fingerprint no:
    // el siguiente pase lo reprocesará.
    assert!(orch.state_store().inner.is_empty());
    let aborted = orch.event_store()
                      .inner
                      .values()
                      .flatten()
                      .any(|e| matches!(e.kind, BuildEventKind::PassAborted { .. }));
    assert!(aborted);
}
