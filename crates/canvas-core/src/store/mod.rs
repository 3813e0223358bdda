//! Registry de resultados: contrato `ArtifactStore`.
//!
//! El registry mapea `JobId` → `Artifact` con búsqueda por clave exacta. El
//! worker es el único escritor y la fachada HTTP la única lectora. Los
//! backends son intercambiables (memoria, directorio scratch, ...).

mod memory;

pub use memory::InMemoryArtifactStore;

use crate::errors::StoreError;
use crate::model::{Artifact, JobId};

pub trait ArtifactStore: Send + Sync {
    /// Guarda el artifact de un job. Si ya existe una entrada para `job_id`
    /// se conserva la primera y devuelve `Ok(false)`.
    fn put(&self, job_id: &JobId, artifact: &Artifact) -> Result<bool, StoreError>;

    /// Recupera el artifact; `StoreError::NotFound` si el job no tiene
    /// entrada.
    fn get(&self, job_id: &JobId) -> Result<Artifact, StoreError>;

    /// Indica si existe una entrada para `job_id`.
    fn exists(&self, job_id: &JobId) -> Result<bool, StoreError>;
}
