//! Documento de salida neutral.
//!
//! Un `OutputDocument` es el artefacto final de un grupo. El motor no
//! interpreta `fields`; sólo exige que cada campo declare de qué inputs
//! proviene (`sources`), lo que da trazabilidad completa hasta el registro de
//! cálculo original.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Estado explícito del documento (no se infiere de colecciones externas).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocState {
    Active,
    Deprecated,
}

/// Valor de un campo con su procedencia.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenancedField {
    pub value: Value,
    /// Ids de los inputs que aportaron el valor, ordenados y sin duplicados.
    pub sources: Vec<String>,
}

impl ProvenancedField {
    pub fn new<I, S>(value: Value, sources: I) -> Self
        where I: IntoIterator<Item = S>,
              S: Into<String>
    {
        let mut sources: Vec<String> = sources.into_iter().map(Into::into).collect();
        sources.sort();
        sources.dedup();
        Self { value, sources }
    }

    pub fn single(value: Value, source: impl Into<String>) -> Self {
        Self { value,
               sources: vec![source.into()] }
    }
}

/// Campos del documento; `BTreeMap` para que la serialización sea estable.
pub type DocumentFields = BTreeMap<String, ProvenancedField>;

/// Metadatos de build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildMeta {
    pub builder_version: String,
    /// Marca más reciente entre los inputs del grupo (determinista).
    pub built_at: DateTime<Utc>,
    pub input_fingerprint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputDocument {
    pub doc_type: String,
    pub group_key: String,
    pub state: DocState,
    pub fields: DocumentFields,
    pub meta: BuildMeta,
}

impl OutputDocument {
    pub fn is_deprecated(&self) -> bool {
        self.state == DocState::Deprecated
    }

    /// Copia marcada como deprecada; el contenido previo se conserva.
    pub fn deprecated(&self) -> Self {
        Self { state: DocState::Deprecated,
               ..self.clone() }
    }

    pub fn field(&self, name: &str) -> Option<&ProvenancedField> {
        self.fields.get(name)
    }
}
