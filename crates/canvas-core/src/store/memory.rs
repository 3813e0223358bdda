use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::ArtifactStore;
use crate::errors::StoreError;
use crate::model::{Artifact, JobId};

/// Backend en memoria (tests y despliegues efímeros).
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    inner: DashMap<JobId, Artifact>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put(&self, job_id: &JobId, artifact: &Artifact) -> Result<bool, StoreError> {
        match self.inner.entry(job_id.clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(artifact.clone());
                Ok(true)
            }
        }
    }

    fn get(&self, job_id: &JobId) -> Result<Artifact, StoreError> {
        self.inner
            .get(job_id)
            .map(|a| a.value().clone())
            .ok_or_else(|| StoreError::NotFound(job_id.to_string()))
    }

    fn exists(&self, job_id: &JobId) -> Result<bool, StoreError> {
        Ok(self.inner.contains_key(job_id))
    }
}
