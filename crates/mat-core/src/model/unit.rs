use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identidad + marca de modificación de un input que contribuye a un grupo.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InputMarker {
    pub id: String,
    pub last_modified: DateTime<Utc>,
}

/// Unidad de build: un grupo independiente con su payload de dominio.
///
/// El payload es opaco para el motor; sólo `key` e `inputs` participan en la
/// detección de cambios.
#[derive(Debug, Clone)]
pub struct BuildUnit<T> {
    pub key: String,
    pub inputs: Vec<InputMarker>,
    pub payload: T,
}

impl<T> BuildUnit<T> {
    pub fn new(key: impl Into<String>, inputs: Vec<InputMarker>, payload: T) -> Self {
        Self { key: key.into(),
               inputs,
               payload }
    }

    /// Marca más reciente entre los inputs; `None` si la unidad está vacía.
    pub fn newest_input(&self) -> Option<DateTime<Utc>> {
        self.inputs.iter().map(|m| m.last_modified).max()
    }
}
