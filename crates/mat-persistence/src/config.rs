//! Configuración de las stores y carga del archivo .env.
//! El directorio sale de `MATFLOW_STORE_DIR`; sin valor se usa
//! `./matflow-store`.

use std::path::PathBuf;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

pub const STORE_DIR_VAR: &str = "MATFLOW_STORE_DIR";
pub const DEFAULT_STORE_DIR: &str = "matflow-store";

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub dir: PathBuf,
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
