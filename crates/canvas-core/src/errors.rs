//! Errores del core y del registry de artifacts.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum CoreError {
    #[error("invalid job id '{0}': expected 64 hex characters")] InvalidJobId(String),
    #[error("invalid state transition {from} -> {to}")] InvalidTransition { from: String, to: String },
}

/// Errores del registry (`ArtifactStore`).
///
/// `Serialization` queda aislado a la petición o job que lo provocó: un
/// registro corrupto nunca debe tumbar el proceso.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StoreError {
    #[error("no artifact stored for job {0}")]
    NotFound(String),
    #[error("serialization failure for job {job_id}: {reason}")]
    Serialization { job_id: String, reason: String },
    #[error("storage io error: {0}")]
    Io(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
