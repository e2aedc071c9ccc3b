//! BuildState sobre archivos JSON en `{dir}/build_state/{doc_type}.json`.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use mat_core::{BuildStateEntry, BuildStateStore, StoreError};

use crate::documents::file_stem;
use crate::error::PersistenceError;
use crate::files::JsonMapFile;

#[derive(Debug)]
pub struct JsonBuildStateStore {
    dir: PathBuf,
    files: DashMap<String, Arc<JsonMapFile<BuildStateEntry>>>,
}

impl JsonBuildStateStore {
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self { dir: root.as_ref().join("build_state"),
               files: DashMap::new() }
    }

    fn file(&self, doc_type: &str) -> Result<Arc<JsonMapFile<BuildStateEntry>>, PersistenceError> {
        let stem = file_stem(doc_type)?;
        let file = self.files
                       .entry(stem.to_string())
                       .or_insert_with(|| Arc::new(JsonMapFile::new(self.dir.join(format!("{stem}.json")))));
        Ok(Arc::clone(file.value()))
    }
}

impl BuildStateStore for JsonBuildStateStore {
    fn entries(&self, doc_type: &str) -> Result<Vec<BuildStateEntry>, StoreError> {
        Ok(self.file(doc_type)?.read()?.into_values().collect())
    }

    fn upsert(&self, entry: BuildStateEntry) -> Result<(), StoreError> {
        let file = self.file(&entry.doc_type)?;
        file.update(|entries| {
                entries.insert(entry.group_key.clone(), entry);
            })?;
        Ok(())
    }

    fn remove(&self, doc_type: &str, group_key: &str) -> Result<(), StoreError> {
        self.file(doc_type)?.update(|entries| {
                                entries.remove(group_key);
                            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(key: &str, fp: &str) -> BuildStateEntry {
        BuildStateEntry { doc_type: "thermo".into(),
                          group_key: key.into(),
                          fingerprint: fp.into(),
                          last_build: Utc::now() }
    }

    #[test]
    fn entries_survive_reopen_and_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonBuildStateStore::open(dir.path());
            store.upsert(entry("Na|GGA", "f1")).unwrap();
            store.upsert(entry("K|GGA", "f2")).unwrap();
            store.upsert(entry("K|GGA", "f3")).unwrap();
        }
        let store = JsonBuildStateStore::open(dir.path());
        let entries = store.entries("thermo").unwrap();
        assert_eq!(entries.iter().map(|e| e.group_key.as_str()).collect::<Vec<_>>(), vec!["K|GGA", "Na|GGA"]);
        assert_eq!(entries[0].fingerprint, "f3");

        store.remove("thermo", "K|GGA").unwrap();
        store.remove("thermo", "K|GGA").unwrap();
        assert_eq!(store.entries("thermo").unwrap().len(), 1);
        assert!(store.entries("materials").unwrap().is_empty());
    }
}
