//! Reintentos con backoff en la frontera del orquestador.
//!
//! Política:
//! - Sólo se reintentan errores transitorios (`StoreError::is_transient`).
//! - El intento `n` (1-based) espera `n * backoff_ms` antes de repetir.
//! - Al agotar los intentos se devuelve `BuildError::StoreUnavailable`, que
//!   aborta el pase completo.
use std::time::Duration;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_RETRY_ATTEMPTS, DEFAULT_RETRY_BACKOFF_MS};
use crate::errors::{BuildError, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Número total de intentos (incluye el primero). Mínimo efectivo: 1.
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_RETRY_ATTEMPTS,
               backoff_ms: DEFAULT_RETRY_BACKOFF_MS }
    }
}

impl RetryPolicy {
    /// Sin esperas; pensado para tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts,
               backoff_ms: 0 }
    }
}

/// Ejecuta `f` aplicando la política de reintentos.
pub fn with_retry<F, T>(policy: RetryPolicy, operation: &str, mut f: F) -> Result<T, BuildError>
    where F: FnMut() -> Result<T, StoreError>
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let delay_ms = policy.backoff_ms * attempt as u64;
                warn!("retryable store error during {operation} (attempt {attempt}/{max_attempts}): {e} -> sleeping {delay_ms}ms");
                if delay_ms > 0 {
                    std::thread::sleep(Duration::from_millis(delay_ms));
                }
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                return Err(BuildError::StoreUnavailable { operation: operation.to_string(),
                                                          attempts: attempt,
                                                          cause: e })
            }
            Err(e) => {
                return Err(BuildError::Store { operation: operation.to_string(),
                                               cause: e })
            }
        }
    }
}
