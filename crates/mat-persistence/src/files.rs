//! Archivo JSON con un mapa `clave → valor`, reescrito completo en cada
//! escritura.
//!
//! La escritura va a un temporal y se renombra sobre el destino, así un
//! lector nunca ve un archivo a medias. Un `Mutex` por archivo serializa las
//! escrituras del mismo proceso; varios procesos sobre el mismo directorio
//! no están soportados.
use std::collections::BTreeMap;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PersistenceError;

#[derive(Debug)]
pub struct JsonMapFile<V> {
    path: PathBuf,
    lock: Mutex<()>,
    _value: PhantomData<fn() -> V>,
}

impl<V> JsonMapFile<V>
    where V: Serialize + DeserializeOwned
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(),
               lock: Mutex::new(()),
               _value: PhantomData }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // el contenido vive en disco; un pánico previo no deja estado en memoria
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_unlocked(&self) -> Result<BTreeMap<String, V>, PersistenceError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(PersistenceError::io(&self.path, e)),
        };
        if text.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&text).map_err(|e| PersistenceError::corrupt(&self.path, e))
    }

    fn write_unlocked(&self, map: &BTreeMap<String, V>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| PersistenceError::io(parent, e))?;
        }
        let text = serde_json::to_string_pretty(map).map_err(|e| PersistenceError::corrupt(&self.path, e))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| PersistenceError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| PersistenceError::io(&self.path, e))?;
        debug!("wrote {} entries to {}", map.len(), self.path.display());
        Ok(())
    }

    pub fn read(&self) -> Result<BTreeMap<String, V>, PersistenceError> {
        let _g = self.guard();
        self.read_unlocked()
    }

    /// Lee, aplica `f` y reescribe, todo bajo el mismo lock.
    pub fn update<F>(&self, f: F) -> Result<(), PersistenceError>
        where F: FnOnce(&mut BTreeMap<String, V>)
    {
        let _g = self.guard();
        let mut map = self.read_unlocked()?;
        f(&mut map);
        self.write_unlocked(&map)
    }
}
