//! Estado compartido del servidor y su construcción a partir de la
//! configuración o de piezas explícitas (tests, embebido).
use std::sync::Arc;

use canvas_adapters::{BlobStore, HttpLivenessProbe, LivenessProbe, PlaceholderSynthesizer, ProofSynthesizer, WalrusBlobStore};
use canvas_core::{ArtifactStore, InMemoryArtifactStore};
use canvas_persistence::{FsArtifactStore, StoreBackend};
use canvas_policies::{AdmissionPolicy, PasteRatioPolicy};
use log::info;

use crate::config::{AppConfig, JobsConfig, DEFAULT_MAX_BODY_BYTES};
use crate::errors::AppError;
use crate::jobs::{JobManager, JobWorker};

#[derive(Clone)]
pub struct AppState {
    pub jobs: JobManager,
    pub policy: Arc<dyn AdmissionPolicy>,
    /// Tope del cuerpo de las peticiones; `None` = sin tope.
    pub max_body_bytes: Option<usize>,
}

/// Piezas con las que se arma un `AppState`.
pub struct AppParts {
    pub store: Arc<dyn ArtifactStore>,
    pub policy: Arc<dyn AdmissionPolicy>,
    pub blobs: Arc<dyn BlobStore>,
    pub probe: Option<Arc<dyn LivenessProbe>>,
    pub synth: Arc<dyn ProofSynthesizer>,
    pub jobs: JobsConfig,
}

impl AppState {
    pub fn from_parts(parts: AppParts) -> Self {
        let worker = JobWorker::new(parts.probe, parts.blobs, parts.synth, parts.store);
        Self { jobs: JobManager::new(worker, parts.jobs),
               policy: parts.policy,
               max_body_bytes: Some(DEFAULT_MAX_BODY_BYTES) }
    }

    pub fn with_max_body_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store: Arc<dyn ArtifactStore> = match config.store.backend {
            StoreBackend::Fs => {
                info!("store: fs scratch_dir={}", config.store.scratch_dir.display());
                Arc::new(FsArtifactStore::open(&config.store.scratch_dir)?)
            }
            StoreBackend::Memory => {
                info!("store: in-memory");
                Arc::new(InMemoryArtifactStore::new())
            }
        };
        let blobs = WalrusBlobStore::new(&config.walrus.publisher_url,
                                         &config.walrus.aggregator_url,
                                         config.walrus.epochs,
                                         config.http_timeout)?;
        let probe = match &config.prover_url {
            Some(url) => Some(Arc::new(HttpLivenessProbe::new(url, config.http_timeout)?) as Arc<dyn LivenessProbe>),
            None => None,
        };
        info!("admission: marker='{}' jobs: max_concurrent={} timeout={:?} retention={:?} max_body_bytes={:?}",
              config.admission_marker, config.jobs.max_concurrent, config.jobs.timeout, config.jobs.retention,
              config.max_body_bytes);
        let parts = AppParts { store,
                               policy: Arc::new(PasteRatioPolicy::new(config.admission_marker.clone())),
                               blobs: Arc::new(blobs),
                               probe,
                               synth: Arc::new(PlaceholderSynthesizer::new(config.jobs.proof_delay)),
                               jobs: config.jobs };
        Ok(Self::from_parts(parts).with_max_body_bytes(config.max_body_bytes))
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStore> {
        self.jobs.store()
    }
}
