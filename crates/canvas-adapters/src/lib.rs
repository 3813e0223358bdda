//! canvas-adapters: colaboradores externos del worker de jobs.
//!
//! Este crate provee:
//! - `blob_store`: subida del payload de la imagen a un store
//!   content-addressable (Walrus) detrás del trait `BlobStore`.
//! - `prover`: ping de vida al servicio de prueba externo (`LivenessProbe`).
//! - `synth`: síntesis del `Artifact` (`ProofSynthesizer`); la computación
//!   real de la prueba es opaca y se sustituye por `PlaceholderSynthesizer`.
//!
//! Todos los traits son `Send + Sync` para poder compartirse entre tareas
//! tokio a través de `Arc<dyn ...>`.

pub mod blob_store;
pub mod prover;
pub mod synth;

pub use blob_store::{parse_store_envelope, prepare_upload, upload, BlobLocator, BlobStore, UploadError, WalrusBlobStore};
pub use prover::{HttpLivenessProbe, LivenessProbe, ProbeError};
pub use synth::{PlaceholderSynthesizer, ProofSynthesizer, SynthesisInput};
