use thiserror::Error;

use mat_classify::ConfigError;
use mat_core::{BuildError, StoreError};
use mat_domain::DomainError;
use mat_persistence::PersistenceError;

/// Errores de la aplicación (configuración, entrada y ejecución del
/// pipeline).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuración inválida: {var}={value}: {reason}")]
    InvalidSetting { var: String, value: String, reason: String },
    #[error("Tablas de reglas inválidas: {0}")]
    Rules(#[from] ConfigError),
    #[error("Entrada inválida: {0}")]
    Domain(#[from] DomainError),
    #[error("Error de persistencia: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("Pase de build abortado: {0}")]
    Build(#[from] BuildError),
    #[error("Error de serialización: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AppError {
    /// `true` si el problema está en la entrada o la configuración (no en
    /// la ejecución).
    pub fn is_rejected_input(&self) -> bool {
        match self {
            AppError::InvalidSetting { .. } | AppError::Rules(_) | AppError::Domain(_) => true,
            AppError::Persistence(e) => {
                matches!(e,
                         PersistenceError::InvalidInput(_) | PersistenceError::NotFound(_) | PersistenceError::Corrupt { .. })
            }
            AppError::Build(BuildError::Store { cause: StoreError::Corrupt(_),
                                                .. }) => true,
            AppError::Build(_) | AppError::Serialization(_) => false,
        }
    }
}
