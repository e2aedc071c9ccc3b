//! Errores del motor de builds.
//!
//! Taxonomía:
//! - `StoreError`: fallos de las stores externas; sólo `Unavailable` es
//!   transitorio y se reintenta.
//! - `GroupProcessingFailure`: fallo aislado de un grupo; nunca aborta el
//!   pase.
//! - `BuildError`: fallos que abortan el pase completo.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("corrupt store content: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Sólo los errores transitorios justifican un reintento.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Fallo procesando un grupo concreto.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("group {group_key} failed: {cause}")]
pub struct GroupProcessingFailure {
    pub group_key: String,
    pub cause: String,
}

impl GroupProcessingFailure {
    pub fn new(group_key: impl Into<String>, cause: impl Into<String>) -> Self {
        Self { group_key: group_key.into(),
               cause: cause.into() }
    }
}

/// Errores que abortan un pase de build.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("store unavailable during {operation} after {attempts} attempts: {cause}")]
    StoreUnavailable { operation: String, attempts: u32, cause: StoreError },
    #[error("store error during {operation}: {cause}")]
    Store { operation: String, cause: StoreError },
    #[error("duplicate build unit key: {0}")]
    DuplicateUnit(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_unavailable_is_transient() {
        assert!(StoreError::Unavailable("down".into()).is_transient());
        assert!(!StoreError::NotFound("x".into()).is_transient());
        assert!(!StoreError::Corrupt("x".into()).is_transient());
    }

    #[test]
    fn failure_display_names_group() {
        let f = GroupProcessingFailure::new("K|GGA", "missing energy");
        assert_eq!(f.to_string(), "group K|GGA failed: missing energy");
    }
}
