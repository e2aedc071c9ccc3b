//! Configuración central de la aplicación.
//! Carga variables de entorno (.env) una sola vez y las vuelca en
//! estructuras explícitas: no hay instancia global de configuración.
use std::env;

use mat_classify::ClassifierConfig;
use mat_core::{BuildConfig, RetryPolicy};
use mat_persistence::config::{DEFAULT_STORE_DIR, STORE_DIR_VAR};
use mat_persistence::{init_dotenv, StoreConfig};

use crate::errors::AppError;

pub const CHUNK_SIZE_VAR: &str = "MATFLOW_CHUNK_SIZE";
pub const FORCE_REBUILD_VAR: &str = "MATFLOW_FORCE_REBUILD";
pub const PARALLEL_VAR: &str = "MATFLOW_PARALLEL";
pub const RETRY_ATTEMPTS_VAR: &str = "MATFLOW_RETRY_ATTEMPTS";
pub const RETRY_BACKOFF_VAR: &str = "MATFLOW_RETRY_BACKOFF_MS";
/// Tolerancia por defecto de las tablas; las tolerancias por clave que
/// declara cada tabla (BPARAM, PARAM1...) se mantienen.
pub const TOLERANCE_VAR: &str = "MATFLOW_TOLERANCE";

/// Configuración de un proceso del pipeline.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directorio de las stores de archivo.
    pub store: StoreConfig,
    /// Chunking, paralelismo, reintentos y rebuild forzado.
    pub build: BuildConfig,
    /// Overrides de tolerancia del clasificador.
    pub classifier: ClassifierConfig,
}

impl AppConfig {
    /// Lee `.env` (si existe) y luego las variables `MATFLOW_*`.
    pub fn from_env() -> Result<Self, AppError> {
        init_dotenv();
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
        where F: Fn(&str) -> Option<String>
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let store = StoreConfig::new(get(STORE_DIR_VAR).unwrap_or_else(|| DEFAULT_STORE_DIR.to_string()));

        let mut build = BuildConfig::default();
        if let Some(raw) = get(CHUNK_SIZE_VAR) {
            let n: usize = parse(CHUNK_SIZE_VAR, &raw)?;
            if n == 0 {
                return Err(invalid(CHUNK_SIZE_VAR, &raw, "must be positive"));
            }
            build = build.with_chunk_size(n);
        }
        if let Some(raw) = get(FORCE_REBUILD_VAR) {
            build.force_full_rebuild = parse_bool(FORCE_REBUILD_VAR, &raw)?;
        }
        if let Some(raw) = get(PARALLEL_VAR) {
            build.parallel = parse_bool(PARALLEL_VAR, &raw)?;
        }
        let mut retry = RetryPolicy::default();
        if let Some(raw) = get(RETRY_ATTEMPTS_VAR) {
            retry.max_attempts = parse(RETRY_ATTEMPTS_VAR, &raw)?;
            if retry.max_attempts == 0 {
                return Err(invalid(RETRY_ATTEMPTS_VAR, &raw, "must be at least 1"));
            }
        }
        if let Some(raw) = get(RETRY_BACKOFF_VAR) {
            retry.backoff_ms = parse(RETRY_BACKOFF_VAR, &raw)?;
        }
        build = build.with_retry(retry);

        let mut classifier = ClassifierConfig::default();
        if let Some(raw) = get(TOLERANCE_VAR) {
            let tol: f64 = parse(TOLERANCE_VAR, &raw)?;
            if !(tol.is_finite() && tol > 0.0) {
                return Err(invalid(TOLERANCE_VAR, &raw, "must be a positive number"));
            }
            classifier = classifier.with_default_tolerance(tol);
        }

        Ok(Self { store,
                  build,
                  classifier })
    }
}

fn invalid(var: &str, value: &str, reason: impl Into<String>) -> AppError {
    AppError::InvalidSetting { var: var.to_string(),
                               value: value.to_string(),
                               reason: reason.into() }
}

fn parse<T>(var: &str, raw: &str) -> Result<T, AppError>
    where T: std::str::FromStr,
          T::Err: std::fmt::Display
{
    raw.trim().parse().map_err(|e: T::Err| invalid(var, raw, e.to_string()))
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, raw, "expected true/false")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_without_variables() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.store.dir, std::path::PathBuf::from(DEFAULT_STORE_DIR));
        assert_eq!(cfg.build.chunk_size, None);
        assert!(cfg.build.parallel);
        assert!(!cfg.build.force_full_rebuild);
        assert_eq!(cfg.classifier, ClassifierConfig::default());
    }

    #[test]
    fn variables_override_every_section() {
        let cfg = AppConfig::from_lookup(lookup(&[("MATFLOW_STORE_DIR", "/data/mf"),
                                                  ("MATFLOW_CHUNK_SIZE", "250"),
                                                  ("MATFLOW_FORCE_REBUILD", "yes"),
                                                  ("MATFLOW_PARALLEL", "false"),
                                                  ("MATFLOW_RETRY_ATTEMPTS", "5"),
                                                  ("MATFLOW_RETRY_BACKOFF_MS", "0"),
                                                  ("MATFLOW_TOLERANCE", "1e-3")])).unwrap();
        assert_eq!(cfg.store.dir, std::path::PathBuf::from("/data/mf"));
        assert_eq!(cfg.build.chunk_size, Some(250));
        assert!(cfg.build.force_full_rebuild);
        assert!(!cfg.build.parallel);
        assert_eq!(cfg.build.retry.max_attempts, 5);
        assert_eq!(cfg.build.retry.backoff_ms, 0);
        assert_eq!(cfg.classifier.default_tolerance, Some(1e-3));
    }

    #[test]
    fn bad_values_name_the_variable() {
        for (var, value) in [("MATFLOW_CHUNK_SIZE", "0"),
                             ("MATFLOW_CHUNK_SIZE", "many"),
                             ("MATFLOW_PARALLEL", "maybe"),
                             ("MATFLOW_RETRY_ATTEMPTS", "0"),
                             ("MATFLOW_TOLERANCE", "-1")]
        {
            let err = AppConfig::from_lookup(lookup(&[(var, value)])).unwrap_err();
            assert!(err.to_string().contains(var), "{err}");
        }
    }
}
