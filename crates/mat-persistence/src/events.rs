//! Bitácora de eventos de build en JSON lines (`{dir}/events.jsonl`).
//!
//! Append-only. Los eventos son auditoría: un fallo al escribir se registra
//! con `warn!` y no aborta el pase (el contrato del core es infalible).
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use log::{debug, warn};
use uuid::Uuid;

use mat_core::{BuildEvent, BuildEventKind, BuildEventStore};

use crate::error::PersistenceError;

#[derive(Debug)]
pub struct JsonlEventStore {
    path: PathBuf,
    next_seq: u64,
}

impl JsonlEventStore {
    /// Abre la bitácora y continúa la numeración de `seq`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = root.as_ref().join("events.jsonl");
        let next_seq = read_all(&path)?.last().map(|e| e.seq + 1).unwrap_or(0);
        Ok(Self { path, next_seq })
    }

    fn append_line(&self, event: &BuildEvent) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let line = serde_json::to_string(event).map_err(|e| PersistenceError::corrupt(&self.path, e))?;
        let mut file = OpenOptions::new().create(true)
                                         .append(true)
                                         .open(&self.path)
                                         .map_err(|e| PersistenceError::io(&self.path, e))?;
        writeln!(file, "{line}").map_err(|e| PersistenceError::io(&self.path, e))
    }
}

fn read_all(path: &Path) -> Result<Vec<BuildEvent>, PersistenceError> {
    let file = match fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(PersistenceError::io(path, e)),
    };
    let mut out = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| PersistenceError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(serde_json::from_str(&line).map_err(|e| PersistenceError::corrupt(path, e))?);
    }
    Ok(out)
}

impl BuildEventStore for JsonlEventStore {
    fn append_kind(&mut self, pass_id: Uuid, kind: BuildEventKind) -> BuildEvent {
        let ev = BuildEvent { seq: self.next_seq,
                              pass_id,
                              kind,
                              ts: Utc::now() };
        self.next_seq += 1;
        match self.append_line(&ev) {
            Ok(()) => debug!("event seq={} pass={pass_id} appended", ev.seq),
            Err(e) => warn!("could not append build event seq={}: {e}", ev.seq),
        }
        ev
    }

    fn list(&self, pass_id: Uuid) -> Vec<BuildEvent> {
        match read_all(&self.path) {
            Ok(events) => events.into_iter().filter(|e| e.pass_id == pass_id).collect(),
            Err(e) => {
                warn!("could not read build events: {e}");
                Vec::new()
            }
        }
    }
}
