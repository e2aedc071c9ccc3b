//! Registros de cálculo sobre un archivo JSON (`{dir}/records.json`).
//!
//! Para el pipeline es una `CalculationSource` de sólo lectura; la ingesta
//! es una operación aparte, usada por la CLI para poblar el directorio.
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::info;

use mat_adapters::CalculationSource;
use mat_core::StoreError;
use mat_domain::{CalculationRecord, StructureKey};

use crate::error::PersistenceError;
use crate::files::JsonMapFile;

/// Lee un arreglo JSON de registros. Un registro inválido rechaza el
/// archivo completo.
pub fn read_records_file(path: impl AsRef<Path>) -> Result<Vec<CalculationRecord>, PersistenceError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| PersistenceError::InvalidInput(format!("{}: {e}", path.display())))
}

#[derive(Debug)]
pub struct JsonRecordStore {
    file: JsonMapFile<CalculationRecord>,
}

impl JsonRecordStore {
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self { file: JsonMapFile::new(root.as_ref().join("records.json")) }
    }

    /// Inserta o reemplaza por `calc_id`. Devuelve cuántos registros se
    /// escribieron.
    pub fn ingest<I>(&self, records: I) -> Result<usize, PersistenceError>
        where I: IntoIterator<Item = CalculationRecord>
    {
        let mut written = 0;
        self.file.update(|map| {
                     for r in records {
                         map.insert(r.calc_id.clone(), r);
                         written += 1;
                     }
                 })?;
        info!("ingested {written} records into {}", self.file.path().display());
        Ok(written)
    }

    pub fn len(&self) -> Result<usize, PersistenceError> {
        Ok(self.file.read()?.len())
    }

    fn sorted<F>(&self, keep: F) -> Result<Vec<CalculationRecord>, StoreError>
        where F: Fn(&CalculationRecord) -> bool
    {
        // calc_id es la clave del mapa: el orden sale del BTreeMap
        Ok(self.file.read()?.into_values().filter(|r| keep(r)).collect())
    }
}

impl CalculationSource for JsonRecordStore {
    fn structure_keys(&self) -> Result<Vec<StructureKey>, StoreError> {
        let mut keys: Vec<StructureKey> = self.file.read()?.into_values().map(|r| r.structure_key).collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn find_by_structure_key(&self, key: &StructureKey) -> Result<Vec<CalculationRecord>, StoreError> {
        self.sorted(|r| &r.structure_key == key)
    }

    fn modified_since(&self, since: DateTime<Utc>) -> Result<Vec<CalculationRecord>, StoreError> {
        self.sorted(|r| r.last_modified() > since)
    }

    fn get(&self, calc_id: &str) -> Result<Option<CalculationRecord>, StoreError> {
        Ok(self.file.read()?.remove(calc_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_file_must_be_a_valid_array() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        fs::write(&bad,
                  r#"[{"calc_id": "", "structure_key": "K", "software": "vasp", "completed_at": "2024-06-01T00:00:00Z"}]"#).unwrap();
        assert!(matches!(read_records_file(&bad), Err(PersistenceError::InvalidInput(_))));
        assert!(matches!(read_records_file(dir.path().join("missing.json")),
                         Err(PersistenceError::NotFound(_))));
    }
}
