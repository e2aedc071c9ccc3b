use std::collections::HashMap;

use chrono::Utc;
use uuid::Uuid;

use super::{BuildEvent, BuildEventKind};

/// Almacenamiento de eventos append-only.
pub trait BuildEventStore {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&mut self, pass_id: Uuid, kind: BuildEventKind) -> BuildEvent;
    /// Lista eventos de un pase (orden ascendente por seq).
    fn list(&self, pass_id: Uuid) -> Vec<BuildEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    pub inner: HashMap<Uuid, Vec<BuildEvent>>,
}

impl BuildEventStore for InMemoryEventStore {
    fn append_kind(&mut self, pass_id: Uuid, kind: BuildEventKind) -> BuildEvent {
        let events = self.inner.entry(pass_id).or_default();
        let ev = BuildEvent { seq: events.len() as u64,
                              pass_id,
                              kind,
                              ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, pass_id: Uuid) -> Vec<BuildEvent> {
        self.inner.get(&pass_id).cloned().unwrap_or_default()
    }
}

/// Store que descarta los eventos; útil cuando sólo interesa el `BuildReport`.
#[derive(Debug, Default)]
pub struct NullEventStore;

impl BuildEventStore for NullEventStore {
    fn append_kind(&mut self, pass_id: Uuid, kind: BuildEventKind) -> BuildEvent {
        BuildEvent { seq: 0,
                     pass_id,
                     kind,
                     ts: Utc::now() }
    }

    fn list(&self, _pass_id: Uuid) -> Vec<BuildEvent> {
        Vec::new()
    }
}
