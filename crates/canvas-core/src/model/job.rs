//! Identidad y ciclo de vida de un job.
//!
//! `JobId` es la única clave usada tanto para despachar como para consultar.
//! `JobState` modela el ciclo de vida explícito de la tabla de jobs:
//!
//! - `Pending` -> `Running` (obtuvo un permiso del pool)
//! - `Pending` -> `Failed` (cancelado antes de arrancar)
//! - `Running` -> `Completed`
//! - `Running` -> `Failed` (timeout, cancelación o error del registry)
//!
//! `Completed` es terminal. `Failed` es terminal para el job en curso; un
//! nuevo envío del mismo contenido crea un intento nuevo (`attempt + 1`).
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::JOB_ID_HEX_LEN;
use crate::errors::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Valida un id recibido desde fuera (64 caracteres hex). Normaliza a
    /// minúsculas.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.len() != JOB_ID_HEX_LEN || !trimmed.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(CoreError::InvalidJobId(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub(crate) fn from_digest_hex(hex: String) -> Self {
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }

    pub fn can_transition_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!((self, next),
                 (Pending, Running) | (Pending, Failed) | (Running, Completed) | (Running, Failed))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot de un job en la tabla de jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub state: JobState,
    /// Intento actual (1 en el primer despacho).
    pub attempt: u32,
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn pending(job_id: JobId, attempt: u32) -> Self {
        Self { job_id,
               state: JobState::Pending,
               attempt,
               submitted_at: Utc::now(),
               started_at: None,
               finished_at: None,
               error: None }
    }

    /// Aplica una transición validando el grafo de estados.
    pub fn transition(&mut self, next: JobState, error: Option<String>) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidTransition { from: self.state.to_string(),
                                                      to: next.to_string() });
        }
        let now = Utc::now();
        match next {
            JobState::Running => self.started_at = Some(now),
            JobState::Completed | JobState::Failed => self.finished_at = Some(now),
            JobState::Pending => {}
        }
        self.state = next;
        self.error = error;
        Ok(())
    }

    /// `true` si el job es terminal y terminó hace al menos `retention`.
    pub fn expired(&self, retention: Duration) -> bool {
        self.expired_at(Utc::now(), retention)
    }

    pub fn expired_at(&self, now: DateTime<Utc>, retention: Duration) -> bool {
        match self.finished_at {
            Some(done) if self.state.is_terminal() => {
                now.signed_duration_since(done).to_std().is_ok_and(|age| age >= retention)
            }
            _ => false,
        }
    }
}
