//! Cuerpos de petición y respuesta de la API HTTP. Los nombres de campo son
//! el contrato con los clientes existentes.
use canvas_core::{Artifact, JobId, JobState, ProofStatus};
use serde::{Deserialize, Serialize};

/// Texto devuelto por `/proof_status` sin `imageID`.
pub const MISSING_IMAGE_ID: &str = "You need to include an 'imageID'";

/// Campos ausentes cuentan como vacíos.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerificationRequest {
    pub image: String,
    pub logs: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    Verified,
    Unverified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResponse {
    #[serde(rename = "verificationStatus")]
    pub verification_status: VerificationStatus,
    /// Vacío cuando la petición no se verificó.
    #[serde(rename = "imageID")]
    pub image_id: String,
}

impl VerificationResponse {
    pub fn verified(job_id: &JobId) -> Self {
        Self { verification_status: VerificationStatus::Verified,
               image_id: job_id.to_string() }
    }

    pub fn unverified() -> Self {
        Self { verification_status: VerificationStatus::Unverified,
               image_id: String::new() }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    #[serde(rename = "imageID")]
    pub image_id: Option<String>,
}

/// Estado del job visible al cliente; `unknown` si no hay registro alguno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStateView {
    Pending,
    Running,
    Completed,
    Failed,
    Unknown,
}

impl From<Option<JobState>> for JobStateView {
    fn from(state: Option<JobState>) -> Self {
        match state {
            Some(JobState::Pending) => Self::Pending,
            Some(JobState::Running) => Self::Running,
            Some(JobState::Completed) => Self::Completed,
            Some(JobState::Failed) => Self::Failed,
            None => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStatusResponse {
    #[serde(rename = "proofStatus")]
    pub proof_status: ProofStatus,
    #[serde(rename = "ZKproof")]
    pub zk_proof: Artifact,
    #[serde(rename = "jobState")]
    pub job_state: JobStateView,
}

impl ProofStatusResponse {
    pub fn proven(artifact: Artifact) -> Self {
        Self { proof_status: ProofStatus::Proven,
               zk_proof: artifact,
               job_state: JobStateView::Completed }
    }

    pub fn unproven(job_state: JobStateView) -> Self {
        Self { proof_status: ProofStatus::Unproven,
               zk_proof: Artifact::blank(),
               job_state }
    }
}
