use thiserror::Error;

/// Errores de integridad de una tabla de reglas. Siempre fatales al cargar:
/// una tabla que no pasa la validación nunca llega al clasificador.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("malformed rule table: {0}")]
    Malformed(String),
    #[error("cannot read rule table {path}: {cause}")]
    Io { path: String, cause: String },
    #[error("unsupported rule table version {0}")]
    UnsupportedVersion(u32),
    #[error("rule table for {found} where {expected} was expected")]
    WrongSoftware { expected: String, found: String },
    #[error("family {0} appears in run_types but not in priority")]
    UnlistedFamily(String),
    #[error("family {0} appears in priority but has no rules")]
    MissingFamily(String),
    #[error("family {0} listed twice in priority")]
    DuplicateFamily(String),
    #[error("family {0} has an empty rule set")]
    EmptyRuleSet(String),
    #[error("rule {0} has no required parameters")]
    EmptyRule(String),
    #[error("invalid run type label {0:?}")]
    InvalidLabel(String),
    #[error("duplicate run type label {label} (family {family})")]
    DuplicateLabel { label: String, family: String },
    #[error("{context}: parameter {key} is not in the vocabulary")]
    UnknownParameter { context: String, key: String },
    #[error("{context}: parameter {key} listed twice")]
    DuplicateParameter { context: String, key: String },
    #[error("{context}: parameter {key} expects {expected}, found {found}")]
    InvalidValue { context: String, key: String, expected: &'static str, found: String },
    #[error("unknown task type {0:?}")]
    UnknownTaskType(String),
    #[error("task type {0} listed twice")]
    DuplicateTaskType(String),
    #[error("task type {0} can be emitted by the task tree but is not allowed by the table")]
    MissingTaskType(String),
    #[error("rules {first} and {second} in family {family} have the same specificity and can both match")]
    AmbiguousRules { family: String, first: String, second: String },
    #[error("compatibility entry {from} -> {to} references an unknown label")]
    BadCompatibility { from: String, to: String },
    #[error("tolerance for {key} must be a positive number, got {value}")]
    BadTolerance { key: String, value: f64 },
    #[error("invalid conflict rule: {0}")]
    BadConflict(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Malformed(e.to_string())
    }
}
