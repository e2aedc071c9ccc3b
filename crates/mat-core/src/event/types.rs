//! Eventos de un pase de build y estructura `BuildEvent`.
//!
//! Cada pase del orquestador emite eventos a un `BuildEventStore`
//! append-only. Con ellos se reconstruye qué grupos se procesaron, cuáles
//! fallaron y por qué, sin depender del estado mutable del orquestador.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fases de la máquina de estados del orquestador.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildPhase {
    Idle,
    ComputingDelta,
    ProcessingGroups,
    Committing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BuildEventKind {
    /// Primer evento de un pase. Invariante: debe ser el primero del `pass_id`.
    PassStarted { doc_type: String, unit_count: usize, force: bool },
    PhaseEntered { phase: BuildPhase },
    /// Resultado del cálculo de delta.
    DeltaComputed { dirty: usize, unchanged: usize, removed: usize, deferred: usize },
    /// Documento + fingerprint escritos para el grupo.
    GroupCommitted { group_key: String, fingerprint: String },
    /// El grupo falló; su entrada de BuildState no se tocó.
    GroupFailed { group_key: String, cause: String },
    /// El grupo desapareció del input: documento deprecado y entrada podada.
    GroupDeprecated { group_key: String },
    /// Evento de cierre con los contadores del pase.
    PassCompleted { processed: usize, failed: usize, skipped: usize, deprecated: usize, deferred: usize },
    /// El pase se abortó (stores no disponibles).
    PassAborted { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildEvent {
    pub seq: u64, // asignado por la store (orden append)
    pub pass_id: Uuid,
    pub kind: BuildEventKind,
    pub ts: DateTime<Utc>, // metadato, no entra en ningún fingerprint
}
