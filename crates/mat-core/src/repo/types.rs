//! Contratos de las stores externas (BuildState y documentos) y sus
//! implementaciones en memoria.
//!
//! Ambas stores se tratan como servicios opacos con upsert por clave: el
//! orquestador nunca asume transacciones globales, sólo atomicidad por
//! grupo.
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::errors::StoreError;
use crate::model::OutputDocument;

/// Entrada de BuildState para un `(doc_type, group_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStateEntry {
    pub doc_type: String,
    pub group_key: String,
    pub fingerprint: String,
    pub last_build: DateTime<Utc>,
}

pub trait BuildStateStore: Send + Sync {
    /// Todas las entradas de un tipo de documento.
    fn entries(&self, doc_type: &str) -> Result<Vec<BuildStateEntry>, StoreError>;
    /// Upsert por `(doc_type, group_key)`.
    fn upsert(&self, entry: BuildStateEntry) -> Result<(), StoreError>;
    /// Elimina la entrada si existe (no falla si no existe).
    fn remove(&self, doc_type: &str, group_key: &str) -> Result<(), StoreError>;
}

pub trait DocumentStore: Send + Sync {
    fn get(&self, doc_type: &str, group_key: &str) -> Result<Option<OutputDocument>, StoreError>;
    /// Documentos de un tipo, ordenados por `group_key`.
    fn find(&self, doc_type: &str) -> Result<Vec<OutputDocument>, StoreError>;
    /// Reemplaza el documento completo (nunca parches parciales).
    fn upsert(&self, doc: OutputDocument) -> Result<(), StoreError>;
}

type StoreKey = (String, String);

#[derive(Debug, Default)]
pub struct InMemoryBuildStateStore {
    inner: DashMap<StoreKey, BuildStateEntry>,
}

impl InMemoryBuildStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, doc_type: &str, group_key: &str) -> Option<BuildStateEntry> {
        self.inner
            .get(&(doc_type.to_string(), group_key.to_string()))
            .map(|e| e.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl BuildStateStore for InMemoryBuildStateStore {
    fn entries(&self, doc_type: &str) -> Result<Vec<BuildStateEntry>, StoreError> {
        let mut out: Vec<BuildStateEntry> = self.inner
                                                .iter()
                                                .filter(|e| e.key().0 == doc_type)
                                                .map(|e| e.value().clone())
                                                .collect();
        out.sort_by(|a, b| a.group_key.cmp(&b.group_key));
        Ok(out)
    }

    fn upsert(&self, entry: BuildStateEntry) -> Result<(), StoreError> {
        self.inner.insert((entry.doc_type.clone(), entry.group_key.clone()), entry);
        Ok(())
    }

    fn remove(&self, doc_type: &str, group_key: &str) -> Result<(), StoreError> {
        self.inner.remove(&(doc_type.to_string(), group_key.to_string()));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: DashMap<StoreKey, OutputDocument>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, doc_type: &str, group_key: &str) -> Result<Option<OutputDocument>, StoreError> {
        Ok(self.inner
               .get(&(doc_type.to_string(), group_key.to_string()))
               .map(|d| d.value().clone()))
    }

    fn find(&self, doc_type: &str) -> Result<Vec<OutputDocument>, StoreError> {
        let mut out: Vec<OutputDocument> = self.inner
                                               .iter()
                                               .filter(|d| d.key().0 == doc_type)
                                               .map(|d| d.value().clone())
                                               .collect();
        out.sort_by(|a, b| a.group_key.cmp(&b.group_key));
        Ok(out)
    }

    fn upsert(&self, doc: OutputDocument) -> Result<(), StoreError> {
        self.inner.insert((doc.doc_type.clone(), doc.group_key.clone()), doc);
        Ok(())
    }
}
