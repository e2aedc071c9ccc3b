use thiserror::Error;

use mat_domain::Property;

/// Errores de las estrategias de merge. Cada uno se convierte en un
/// `GroupProcessingFailure` del grupo afectado.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MergeError {
    #[error("group {group} has no blessed {property}")]
    MissingProperty { group: String, property: Property },
    #[error("malformed field {field}: {cause}")]
    Malformed { field: String, cause: String },
}

impl MergeError {
    pub fn missing(group: &str, property: Property) -> Self {
        MergeError::MissingProperty { group: group.to_string(),
                                      property }
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(e: serde_json::Error) -> Self {
        MergeError::Malformed { field: "<serialize>".to_string(),
                                cause: e.to_string() }
    }
}
