//! Subsistema de jobs: ejecución (`worker`) y tabla/despacho (`manager`).

pub mod blocking;
pub mod manager;
pub mod worker;

pub use manager::{DispatchOutcome, JobCounts, JobManager};
pub use worker::{JobError, JobWorker};
pub use blocking::with_store;
