//! canvas-persistence
//!
//! Backend durable del registry de artifacts sobre un directorio scratch
//! compartido. Cada job completado produce un archivo `<jobID>___<sufijo>`
//! cuyo cuerpo es el `Artifact` en JSON.
//!
//! Módulos:
//! - `fs`: `FsArtifactStore`, implementación de `ArtifactStore` por archivos.
//! - `config`: carga de configuración del store desde variables de entorno
//!   (.env incluido).
//! - `error`: errores de persistencia y su mapeo a `StoreError`.

pub mod config;
pub mod error;
pub mod fs;

pub use config::{init_dotenv, StoreBackend, StoreConfig};
pub use error::PersistenceError;
pub use fs::FsArtifactStore;
