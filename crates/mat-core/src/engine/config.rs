use serde::{Deserialize, Serialize};

use super::RetryPolicy;

/// Configuración explícita de un orquestador (sin estado global).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Máximo de grupos sucios procesados por pase; `None` = sin límite.
    pub chunk_size: Option<usize>,
    /// Ignora BuildState y reprocesa todos los grupos.
    pub force_full_rebuild: bool,
    /// Procesa grupos en paralelo con rayon.
    pub parallel: bool,
    pub retry: RetryPolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { chunk_size: None,
               force_full_rebuild: false,
               parallel: true,
               retry: RetryPolicy::default() }
    }
}

impl BuildConfig {
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn forced(mut self) -> Self {
        self.force_full_rebuild = true;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
