//! Errores de persistencia.
//! Mapea errores de IO / serde a variantes semánticas y, en la frontera con
//! el core, a `StoreError` (sólo el IO es reintentable).

use std::path::Path;

use thiserror::Error;

use mat_core::StoreError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("transient IO error: {0}")]
    TransientIo(String),
    #[error("corrupt store file {path}: {cause}")]
    Corrupt { path: String, cause: String },
    #[error("invalid record input: {0}")]
    InvalidInput(String),
}

impl PersistenceError {
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path.display().to_string())
        } else {
            Self::TransientIo(format!("{}: {err}", path.display()))
        }
    }

    pub fn corrupt(path: &Path, cause: impl ToString) -> Self {
        Self::Corrupt { path: path.display().to_string(),
                        cause: cause.to_string() }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(what) => StoreError::NotFound(what),
            PersistenceError::TransientIo(msg) => StoreError::Unavailable(msg),
            e @ (PersistenceError::Corrupt { .. } | PersistenceError::InvalidInput(_)) => StoreError::Corrupt(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_io_maps_to_transient() {
        let p = Path::new("/tmp/x.json");
        let transient: StoreError = PersistenceError::io(p, std::io::Error::other("disk busy")).into();
        assert!(transient.is_transient());
        let missing: StoreError = PersistenceError::io(p, std::io::ErrorKind::NotFound.into()).into();
        assert!(matches!(missing, StoreError::NotFound(_)));
        let corrupt: StoreError = PersistenceError::corrupt(p, "eof").into();
        assert!(!corrupt.is_transient());
    }
}
