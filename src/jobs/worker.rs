//! Ejecución de un job de prueba.
//!
//! Fases, estrictamente en orden:
//! 1. ping de vida al prover (opcional, nunca fatal);
//! 2. subida del payload al blob store (un fallo deja el localizador vacío);
//! 3. síntesis del `Artifact`;
//! 4. `put` en el registry, único punto de commit (en el pool de bloqueo).
//!
//! Sólo la fase 4 puede hacer fallar el job.

use std::sync::Arc;
use std::time::Duration;

use canvas_adapters::{upload, BlobStore, LivenessProbe, ProofSynthesizer, SynthesisInput};
use canvas_core::{Artifact, ArtifactStore, JobId, StoreError};
use log::{debug, info, warn};
use thiserror::Error;

use super::blocking::with_store;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("registry write failed: {0}")] Store(#[from] StoreError),
    #[error("timed out after {0:?}")] TimedOut(Duration),
    #[error("cancelled")] Cancelled,
    #[error("worker panicked: {0}")] Panicked(String),
}

/// Colaboradores de un job. Todos compartidos vía `Arc<dyn ...>`.
#[derive(Clone)]
pub struct JobWorker {
    probe: Option<Arc<dyn LivenessProbe>>,
    blobs: Arc<dyn BlobStore>,
    synth: Arc<dyn ProofSynthesizer>,
    store: Arc<dyn ArtifactStore>,
}

impl JobWorker {
    pub fn new(probe: Option<Arc<dyn LivenessProbe>>,
               blobs: Arc<dyn BlobStore>,
               synth: Arc<dyn ProofSynthesizer>,
               store: Arc<dyn ArtifactStore>)
               -> Self {
        Self { probe,
               blobs,
               synth,
               store }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        &self.store
    }

    pub async fn run(&self, job_id: &JobId, image: &str) -> Result<Artifact, JobError> {
        if let Some(probe) = &self.probe {
            match probe.ping().await {
                Ok(status) => info!("job:ping job_id={job_id} status={status}"),
                Err(e) => warn!("job:ping job_id={job_id} err={e}"),
            }
        }

        let locator = match upload(self.blobs.as_ref(), image).await {
            Ok(loc) => {
                info!("job:upload job_id={job_id} blob_id={}", loc.blob_id);
                loc.uri
            }
            Err(e) => {
                warn!("job:upload job_id={job_id} err={e}; continuing without blob");
                String::new()
            }
        };

        let artifact = self.synth
                           .synthesize(SynthesisInput { job_id,
                                                        image,
                                                        blob_locator: &locator })
                           .await;
        debug!("job:synth job_id={job_id} proof_elements={}", artifact.proof_elements.len());

        let (key, record) = (job_id.clone(), artifact.clone());
        if !with_store(&self.store, move |store| store.put(&key, &record)).await? {
            debug!("job:store job_id={job_id} already stored, first record kept");
        }
        info!("job:done job_id={job_id}");
        Ok(artifact)
    }
}
