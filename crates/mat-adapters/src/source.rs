//! Fuente de registros de cálculo (sólo lectura).
//!
//! La fuente es un servicio externo opaco: el pipeline nunca escribe en
//! ella. Las correcciones llegan como registros nuevos.
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use mat_core::StoreError;
use mat_domain::{CalculationRecord, StructureKey};

pub trait CalculationSource: Send + Sync {
    /// Claves estructurales presentes, ordenadas y sin duplicados.
    fn structure_keys(&self) -> Result<Vec<StructureKey>, StoreError>;
    /// Registros de una clave, ordenados por `calc_id`.
    fn find_by_structure_key(&self, key: &StructureKey) -> Result<Vec<CalculationRecord>, StoreError>;
    /// Registros con marca de modificación estrictamente posterior a `since`.
    fn modified_since(&self, since: DateTime<Utc>) -> Result<Vec<CalculationRecord>, StoreError>;
    fn get(&self, calc_id: &str) -> Result<Option<CalculationRecord>, StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryCalculationSource {
    inner: DashMap<String, CalculationRecord>,
}

impl InMemoryCalculationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
        where I: IntoIterator<Item = CalculationRecord>
    {
        let source = Self::new();
        for r in records {
            source.insert(r);
        }
        source
    }

    /// Inserta o reemplaza por `calc_id`.
    pub fn insert(&self, record: CalculationRecord) {
        self.inner.insert(record.calc_id.clone(), record);
    }

    pub fn remove(&self, calc_id: &str) -> Option<CalculationRecord> {
        self.inner.remove(calc_id).map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn sorted<F>(&self, keep: F) -> Vec<CalculationRecord>
        where F: Fn(&CalculationRecord) -> bool
    {
        let mut out: Vec<CalculationRecord> = self.inner
                                                  .iter()
                                                  .filter(|r| keep(r.value()))
                                                  .map(|r| r.value().clone())
                                                  .collect();
        out.sort_by(|a, b| a.calc_id.cmp(&b.calc_id));
        out
    }
}

impl CalculationSource for InMemoryCalculationSource {
    fn structure_keys(&self) -> Result<Vec<StructureKey>, StoreError> {
        let keys: BTreeSet<StructureKey> = self.inner.iter().map(|r| r.value().structure_key.clone()).collect();
        Ok(keys.into_iter().collect())
    }

    fn find_by_structure_key(&self, key: &StructureKey) -> Result<Vec<CalculationRecord>, StoreError> {
        Ok(self.sorted(|r| &r.structure_key == key))
    }

    fn modified_since(&self, since: DateTime<Utc>) -> Result<Vec<CalculationRecord>, StoreError> {
        Ok(self.sorted(|r| r.last_modified() > since))
    }

    fn get(&self, calc_id: &str) -> Result<Option<CalculationRecord>, StoreError> {
        Ok(self.inner.get(calc_id).map(|r| r.value().clone()))
    }
}
