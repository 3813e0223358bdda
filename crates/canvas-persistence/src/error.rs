//! Errores de persistencia.
//! Mapea errores de IO / serde a variantes semánticas y luego a `StoreError`.

use canvas_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("scratch dir unavailable: {0}")]
    ScratchDir(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed record {path}: {reason}")]
    MalformedRecord { path: String, job_id: String, reason: String },
    #[error("not found")]
    NotFound(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io { path: path.display().to_string(), source }
    }
}

impl From<PersistenceError> for StoreError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::NotFound(job_id) => StoreError::NotFound(job_id),
            PersistenceError::MalformedRecord { job_id, reason, .. } => StoreError::Serialization { job_id, reason },
            other => StoreError::Io(other.to_string()),
        }
    }
}
