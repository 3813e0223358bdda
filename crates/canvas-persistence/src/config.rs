//! Carga de configuración del store desde variables de entorno.
//! Usa `SCRATCH_DIR` (directorio de registros) y `STORE_BACKEND`
//! (`fs` | `memory`).

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use dotenvy::dotenv;
use once_cell::sync::Lazy;

use crate::error::PersistenceError;

// Carga perezosa del archivo .env una sola vez.
static DOTENV_LOADED: Lazy<()> = Lazy::new(|| {
    let _ = dotenv(); // ignora error si no existe .env
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Fs,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = PersistenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "fs" | "file" | "disk" => Ok(Self::Fs),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(PersistenceError::InvalidConfig(format!("STORE_BACKEND={other}"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub scratch_dir: PathBuf,
}

impl StoreConfig {
    pub fn from_env() -> Result<Self, PersistenceError> {
        // asegura que .env se haya cargado
        Lazy::force(&DOTENV_LOADED);
        let backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Fs,
        };
        let scratch_dir = env::var("SCRATCH_DIR").ok()
                                                 .filter(|v| !v.trim().is_empty())
                                                 .map(PathBuf::from)
                                                 .unwrap_or_else(env::temp_dir);
        Ok(Self { backend, scratch_dir })
    }
}

/// Forzar carga temprana de .env desde aplicaciones externas si se desea.
pub fn init_dotenv() {
    Lazy::force(&DOTENV_LOADED);
}
