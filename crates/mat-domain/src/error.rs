use thiserror::Error;

/// Errores de validación al ingerir registros de cálculo.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("{0}")]
    ValidationError(String),
    #[error("parameter {key}: expected {expected}, found {found}")]
    InvalidParameter { key: String, expected: &'static str, found: String },
    #[error("unknown software: {0}")]
    UnknownSoftware(String),
    #[error("serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::SerializationError(e.to_string())
    }
}
