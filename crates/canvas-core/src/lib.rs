//! canvas-core: núcleo neutral del subsistema de jobs de prueba.
//!
//! Contiene las piezas sin IO de red que comparten el servidor, el CLI y los
//! adaptadores:
//! - `hashing`: fingerprint SHA-256 que identifica un job (`JobId`) y hashes
//!   auxiliares BLAKE3.
//! - `model`: `Artifact` (resultado inmutable de un job), `JobId`,
//!   `JobState`/`JobRecord` y el parseo de data-URIs.
//! - `store`: contrato `ArtifactStore` (registry de resultados) y su backend
//!   en memoria.
//! - `errors`: errores del core y del registry.
pub mod constants;
pub mod errors;
pub mod hashing;
pub mod model;
pub mod store;

pub use errors::{CoreError, StoreError};
pub use hashing::{fingerprint, fingerprint_image};
pub use model::{Artifact, DataUri, JobId, JobRecord, JobState, ProofStatus};
pub use store::{ArtifactStore, InMemoryArtifactStore};
