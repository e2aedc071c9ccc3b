//! Constantes del motor de builds.
//!
//! `BUILDER_VERSION` forma parte del input de cada fingerprint de grupo: al
//! cambiarla todos los grupos quedan sucios en el siguiente pase aunque los
//! datos no cambien. Mantener estable mientras no haya cambios incompatibles
//! en el formato de los documentos.

/// Versión lógica del builder.
pub const BUILDER_VERSION: &str = "B1.0";

/// Intentos por defecto ante fallos transitorios de las stores.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;

/// Backoff base (ms); el intento `n` espera `n * base`.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 15;
