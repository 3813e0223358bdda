//! Ping de vida al servicio de prueba externo.
//!
//! El resultado es informativo: el worker lo registra y continúa aunque
//! el servicio no responda.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("prover unreachable: {0}")]
    Unreachable(String),
    #[error("probe client: {0}")]
    Client(String),
}

#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Devuelve el código HTTP observado.
    async fn ping(&self) -> Result<u16, ProbeError>;
}

#[derive(Debug, Clone)]
pub struct HttpLivenessProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpLivenessProbe {
    pub fn new(url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ProbeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| ProbeError::Client(e.to_string()))?;
        Ok(Self { client, url: url.into() })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl LivenessProbe for HttpLivenessProbe {
    async fn ping(&self) -> Result<u16, ProbeError> {
        let resp = self.client
                       .get(self.url.as_str())
                       .send()
                       .await
                       .map_err(|e| ProbeError::Unreachable(format!("{}: {e}", self.url)))?;
        let status = resp.status().as_u16();
        debug!("probe: url={} status={status}", self.url);
        Ok(status)
    }
}
