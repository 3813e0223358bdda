//! Modelos neutrales (Artifact, JobId, JobState, DataUri).

pub mod artifact;
pub mod data_uri;
pub mod job;

pub use artifact::{Artifact, ProofStatus};
pub use data_uri::DataUri;
pub use job::{JobId, JobRecord, JobState};
