//! Store de documentos sobre archivos JSON: un archivo por tipo de
//! documento en `{dir}/documents/{doc_type}.json`, indexado por
//! `group_key`.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use mat_core::{DocumentStore, OutputDocument, StoreError};

use crate::error::PersistenceError;
use crate::files::JsonMapFile;

/// Valida que un nombre pueda usarse como nombre de archivo.
pub(crate) fn file_stem(name: &str) -> Result<&str, PersistenceError> {
    let ok = !name.is_empty()
             && name.chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(name)
    } else {
        Err(PersistenceError::InvalidInput(format!("'{name}' is not a valid store name")))
    }
}

#[derive(Debug)]
pub struct JsonDocumentStore {
    dir: PathBuf,
    files: DashMap<String, Arc<JsonMapFile<OutputDocument>>>,
}

impl JsonDocumentStore {
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self { dir: root.as_ref().join("documents"),
               files: DashMap::new() }
    }

    fn file(&self, doc_type: &str) -> Result<Arc<JsonMapFile<OutputDocument>>, PersistenceError> {
        let stem = file_stem(doc_type)?;
        let file = self.files
                       .entry(stem.to_string())
                       .or_insert_with(|| Arc::new(JsonMapFile::new(self.dir.join(format!("{stem}.json")))));
        Ok(Arc::clone(file.value()))
    }
}

impl DocumentStore for JsonDocumentStore {
    fn get(&self, doc_type: &str, group_key: &str) -> Result<Option<OutputDocument>, StoreError> {
        let mut docs = self.file(doc_type)?.read()?;
        Ok(docs.remove(group_key))
    }

    fn find(&self, doc_type: &str) -> Result<Vec<OutputDocument>, StoreError> {
        // BTreeMap: ya ordenado por group_key
        Ok(self.file(doc_type)?.read()?.into_values().collect())
    }

    fn upsert(&self, doc: OutputDocument) -> Result<(), StoreError> {
        let file = self.file(&doc.doc_type)?;
        file.update(|docs| {
                docs.insert(doc.group_key.clone(), doc);
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_types_must_be_plain_names() {
        assert!(file_stem("materials").is_ok());
        assert!(file_stem("band-structure_v2").is_ok());
        assert!(file_stem("../etc").is_err());
        assert!(file_stem("").is_err());
    }

    #[test]
    fn unknown_doc_type_finds_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDocumentStore::open(dir.path());
        assert!(store.find("materials").unwrap().is_empty());
        assert!(store.get("materials", "K|GGA").unwrap().is_none());
        assert!(matches!(store.find("a/b"), Err(StoreError::Corrupt(_))));
    }
}
