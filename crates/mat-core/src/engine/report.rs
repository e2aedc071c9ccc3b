use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::GroupProcessingFailure;

/// Resumen visible de un pase de build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildReport {
    pub pass_id: Uuid,
    pub doc_type: String,
    pub processed: usize,
    pub failed: usize,
    pub skipped_unchanged: usize,
    pub deprecated: usize,
    /// Grupos sucios que quedaron fuera del chunk de este pase.
    pub deferred: usize,
    pub failures: Vec<GroupProcessingFailure>,
    /// Claves escritas en este pase, en orden de commit.
    pub committed_keys: Vec<String>,
}

impl BuildReport {
    pub(crate) fn empty(pass_id: Uuid, doc_type: &str) -> Self {
        Self { pass_id,
               doc_type: doc_type.to_string(),
               processed: 0,
               failed: 0,
               skipped_unchanged: 0,
               deprecated: 0,
               deferred: 0,
               failures: Vec::new(),
               committed_keys: Vec::new() }
    }

    /// Grupos considerados sucios en este pase (procesados o fallidos).
    pub fn dirty(&self) -> usize {
        self.processed + self.failed
    }

    pub fn failed_keys(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.group_key.as_str()).collect()
    }
}
