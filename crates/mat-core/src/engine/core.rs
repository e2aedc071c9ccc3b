//! Core BuildOrchestrator implementation

use std::collections::{BTreeSet, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use rayon::prelude::*;
use uuid::Uuid;

use crate::constants::BUILDER_VERSION;
use crate::engine::{with_retry, BuildConfig, BuildReport, OrchestratorBuilder, UnitProcessor};
use crate::errors::{BuildError, GroupProcessingFailure};
use crate::event::{BuildEventKind, BuildEventStore, BuildPhase, InMemoryEventStore};
use crate::model::{BuildMeta, BuildUnit, DocState, DocumentFields, GroupFingerprintInput, OutputDocument};
use crate::repo::{BuildStateEntry, BuildStateStore, DocumentStore, InMemoryBuildStateStore, InMemoryDocumentStore};

/// Unidad sucia junto con el fingerprint que se guardará si el commit
/// termina bien.
struct DirtyUnit<T> {
    unit: BuildUnit<T>,
    fingerprint: String,
}

/// Resultado de la fase `ComputingDelta`.
struct Delta<T> {
    dirty: Vec<DirtyUnit<T>>,
    unchanged: usize,
    removed: Vec<String>,
    deferred: usize,
}

/// Orquestador de builds incrementales para un conjunto de stores.
///
/// Máquina de estados por pase: `Idle → ComputingDelta → ProcessingGroups →
/// Committing → Idle`. Un mismo orquestador puede ejecutar pases de varios
/// tipos de documento; cada `UnitProcessor` define el suyo.
#[derive(Debug)]
pub struct BuildOrchestrator<D, S, E>
    where D: DocumentStore,
          S: BuildStateStore,
          E: BuildEventStore
{
    documents: D,
    state: S,
    events: E,
    config: BuildConfig,
    phase: BuildPhase,
}

impl BuildOrchestrator<InMemoryDocumentStore, InMemoryBuildStateStore, InMemoryEventStore> {
    /// Builder con stores en memoria.
    #[inline]
    pub fn in_memory() -> OrchestratorBuilder<InMemoryDocumentStore, InMemoryBuildStateStore, InMemoryEventStore> {
        OrchestratorBuilder::new(InMemoryDocumentStore::new(),
                                 InMemoryBuildStateStore::new(),
                                 InMemoryEventStore::default())
    }
}

impl<D, S, E> BuildOrchestrator<D, S, E>
    where D: DocumentStore,
          S: BuildStateStore,
          E: BuildEventStore
{
    /// Crea un nuevo builder para configurar el orquestador.
    #[inline]
    pub fn builder(documents: D, state: S, events: E) -> OrchestratorBuilder<D, S, E> {
        OrchestratorBuilder::new(documents, state, events)
    }

    pub fn new(documents: D, state: S, events: E, config: BuildConfig) -> Self {
        Self { documents,
               state,
               events,
               config,
               phase: BuildPhase::Idle }
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: BuildConfig) {
        self.config = config;
    }

    pub fn documents(&self) -> &D {
        &self.documents
    }

    pub fn state_store(&self) -> &S {
        &self.state
    }

    pub fn event_store(&self) -> &E {
        &self.events
    }

    /// Marca de modificación más reciente ya incorporada a un documento
    /// activo de `doc_type`; `None` si aún no hay ninguno.
    pub fn input_watermark(&self, doc_type: &str) -> Result<Option<DateTime<Utc>>, BuildError> {
        let docs = with_retry(self.config.retry, "document read", || self.documents.find(doc_type))?;
        Ok(docs.into_iter().filter(|d| !d.is_deprecated()).map(|d| d.meta.built_at).max())
    }

    /// Variante compacta de los eventos de un pase (útil en tests).
    pub fn event_variants(&self, pass_id: Uuid) -> Vec<&'static str> {
        self.events
            .list(pass_id)
            .iter()
            .map(|e| match e.kind {
                BuildEventKind::PassStarted { .. } => "S",
                BuildEventKind::PhaseEntered { .. } => "P",
                BuildEventKind::DeltaComputed { .. } => "D",
                BuildEventKind::GroupCommitted { .. } => "C",
                BuildEventKind::GroupFailed { .. } => "X",
                BuildEventKind::GroupDeprecated { .. } => "R",
                BuildEventKind::PassCompleted { .. } => "F",
                BuildEventKind::PassAborted { .. } => "A",
            })
            .collect()
    }

    /// Ejecuta un pase completo para el tipo de documento de `processor`.
    ///
    /// Los fallos por grupo se reportan en el `BuildReport`; sólo los
    /// fallos de stores (tras agotar reintentos) abortan el pase.
    pub fn run_pass<T, P>(&mut self, processor: &P, units: Vec<BuildUnit<T>>) -> Result<BuildReport, BuildError>
        where T: Sync,
              P: UnitProcessor<T>
    {
        let pass_id = Uuid::new_v4();
        let doc_type = processor.doc_type().to_string();
        self.events.append_kind(pass_id,
                                BuildEventKind::PassStarted { doc_type: doc_type.clone(),
                                                              unit_count: units.len(),
                                                              force: self.config.force_full_rebuild });
        info!("build pass {pass_id} started doc_type={doc_type} units={}", units.len());

        let result = self.run_phases(pass_id, processor, units);
        self.enter(pass_id, BuildPhase::Idle);

        match result {
            Ok(report) => {
                self.events.append_kind(pass_id,
                                        BuildEventKind::PassCompleted { processed: report.processed,
                                                                        failed: report.failed,
                                                                        skipped: report.skipped_unchanged,
                                                                        deprecated: report.deprecated,
                                                                        deferred: report.deferred });
                info!("build pass {pass_id} done doc_type={doc_type} processed={} failed={} skipped={} deprecated={} deferred={}",
                      report.processed,
                      report.failed,
                      report.skipped_unchanged,
                      report.deprecated,
                      report.deferred);
                Ok(report)
            }
            Err(e) => {
                error!("build pass {pass_id} aborted doc_type={doc_type}: {e}");
                self.events.append_kind(pass_id, BuildEventKind::PassAborted { reason: e.to_string() });
                Err(e)
            }
        }
    }

    fn enter(&mut self, pass_id: Uuid, phase: BuildPhase) {
        debug!("pass {pass_id}: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
        self.events.append_kind(pass_id, BuildEventKind::PhaseEntered { phase });
    }

    fn run_phases<T, P>(&mut self, pass_id: Uuid, processor: &P, units: Vec<BuildUnit<T>>) -> Result<BuildReport, BuildError>
        where T: Sync,
              P: UnitProcessor<T>
    {
        let doc_type = processor.doc_type().to_string();
        let mut report = BuildReport::empty(pass_id, &doc_type);

        self.enter(pass_id, BuildPhase::ComputingDelta);
        let delta = self.compute_delta(&doc_type, &processor.digest(), units)?;
        report.skipped_unchanged = delta.unchanged;
        report.deferred = delta.deferred;
        self.events.append_kind(pass_id,
                                BuildEventKind::DeltaComputed { dirty: delta.dirty.len(),
                                                                unchanged: delta.unchanged,
                                                                removed: delta.removed.len(),
                                                                deferred: delta.deferred });

        self.enter(pass_id, BuildPhase::ProcessingGroups);
        let results = self.process_all(processor, &delta.dirty);

        self.enter(pass_id, BuildPhase::Committing);
        self.commit(pass_id, &doc_type, delta.dirty, results, &mut report)?;
        self.deprecate_removed(pass_id, &doc_type, &delta.removed, &mut report)?;
        Ok(report)
    }

    fn compute_delta<T>(&self, doc_type: &str, digest: &str, mut units: Vec<BuildUnit<T>>) -> Result<Delta<T>, BuildError> {
        let retry = self.config.retry;
        let previous: HashMap<String, BuildStateEntry> =
            with_retry(retry, "build state read", || self.state.entries(doc_type))?.into_iter()
                                                                                  .map(|e| (e.group_key.clone(), e))
                                                                                  .collect();

        let mut seen = BTreeSet::new();
        for u in &units {
            if !seen.insert(u.key.as_str()) {
                return Err(BuildError::DuplicateUnit(u.key.clone()));
            }
        }
        units.sort_by(|a, b| a.key.cmp(&b.key));

        let mut dirty = Vec::new();
        let mut unchanged = 0;
        let mut current = BTreeSet::new();
        for unit in units {
            current.insert(unit.key.clone());
            let fingerprint = GroupFingerprintInput::new(doc_type, digest, &unit.key, &unit.inputs).fingerprint();
            let same = previous.get(&unit.key).map(|e| e.fingerprint == fingerprint).unwrap_or(false);
            if same && !self.config.force_full_rebuild {
                unchanged += 1;
            } else {
                dirty.push(DirtyUnit { unit, fingerprint });
            }
        }

        let mut deferred = 0;
        if let Some(chunk) = self.config.chunk_size {
            let chunk = chunk.max(1);
            if dirty.len() > chunk {
                // nunca construidos primero, luego el `last_build` más viejo
                dirty.sort_by_key(|d| previous.get(&d.unit.key).map(|e| e.last_build));
                deferred = dirty.split_off(chunk).len();
            }
        }

        let mut removed: Vec<String> = previous.into_keys().filter(|k| !current.contains(k)).collect();
        removed.sort();
        debug!("delta doc_type={doc_type} dirty={} unchanged={unchanged} removed={} deferred={deferred}",
               dirty.len(),
               removed.len());
        Ok(Delta { dirty,
                   unchanged,
                   removed,
                   deferred })
    }

    fn process_all<T, P>(&self, processor: &P, dirty: &[DirtyUnit<T>]) -> Vec<Result<DocumentFields, GroupProcessingFailure>>
        where T: Sync,
              P: UnitProcessor<T>
    {
        if self.config.parallel {
            dirty.par_iter().map(|d| process_isolated(processor, &d.unit)).collect()
        } else {
            dirty.iter().map(|d| process_isolated(processor, &d.unit)).collect()
        }
    }

    fn commit<T>(&mut self,
                 pass_id: Uuid,
                 doc_type: &str,
                 dirty: Vec<DirtyUnit<T>>,
                 results: Vec<Result<DocumentFields, GroupProcessingFailure>>,
                 report: &mut BuildReport)
                 -> Result<(), BuildError> {
        let retry = self.config.retry;
        for (d, result) in dirty.into_iter().zip(results) {
            let key = d.unit.key.clone();
            match result {
                Ok(fields) => {
                    let doc = OutputDocument { doc_type: doc_type.to_string(),
                                               group_key: key.clone(),
                                               state: DocState::Active,
                                               fields,
                                               meta: BuildMeta { builder_version: BUILDER_VERSION.to_string(),
                                                                 built_at: d.unit.newest_input().unwrap_or_default(),
                                                                 input_fingerprint: d.fingerprint.clone() } };
                    // Documento primero, fingerprint después: si el segundo
                    // write no llega, el grupo sigue sucio y se reescribe igual.
                    with_retry(retry, "document upsert", || self.documents.upsert(doc.clone()))?;
                    let entry = BuildStateEntry { doc_type: doc_type.to_string(),
                                                  group_key: key.clone(),
                                                  fingerprint: d.fingerprint.clone(),
                                                  last_build: Utc::now() };
                    with_retry(retry, "build state upsert", || self.state.upsert(entry.clone()))?;
                    debug!("committed {doc_type}/{key}");
                    self.events.append_kind(pass_id,
                                            BuildEventKind::GroupCommitted { group_key: key.clone(),
                                                                             fingerprint: d.fingerprint });
                    report.processed += 1;
                    report.committed_keys.push(key);
                }
                Err(failure) => {
                    warn!("group {doc_type}/{key} failed: {}", failure.cause);
                    self.events.append_kind(pass_id,
                                            BuildEventKind::GroupFailed { group_key: key,
                                                                          cause: failure.cause.clone() });
                    report.failed += 1;
                    report.failures.push(failure);
                }
            }
        }
        Ok(())
    }

    fn deprecate_removed(&mut self, pass_id: Uuid, doc_type: &str, removed: &[String], report: &mut BuildReport) -> Result<(), BuildError> {
        let retry = self.config.retry;
        for key in removed {
            let existing = with_retry(retry, "document read", || self.documents.get(doc_type, key))?;
            if let Some(doc) = existing {
                if !doc.is_deprecated() {
                    let deprecated = doc.deprecated();
                    with_retry(retry, "document upsert", || self.documents.upsert(deprecated.clone()))?;
                }
            }
            with_retry(retry, "build state remove", || self.state.remove(doc_type, key))?;
            info!("group {doc_type}/{key} no longer present: document deprecated");
            self.events.append_kind(pass_id, BuildEventKind::GroupDeprecated { group_key: key.clone() });
            report.deprecated += 1;
        }
        Ok(())
    }
}

/// Procesa una unidad aislando pánicos: un grupo malformado nunca tumba el
/// pase.
fn process_isolated<T, P>(processor: &P, unit: &BuildUnit<T>) -> Result<DocumentFields, GroupProcessingFailure>
    where P: UnitProcessor<T>
{
    match catch_unwind(AssertUnwindSafe(|| processor.process(unit))) {
        Ok(result) => result,
        Err(payload) => {
            let msg = payload.downcast_ref::<&str>()
                             .map(|s| s.to_string())
                             .or_else(|| payload.downcast_ref::<String>().cloned())
                             .unwrap_or_else(|| "unknown panic".to_string());
            Err(GroupProcessingFailure::new(unit.key.clone(), format!("panic: {msg}")))
        }
    }
}
