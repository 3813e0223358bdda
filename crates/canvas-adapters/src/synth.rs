//! Síntesis del `Artifact` de un job.
//!
//! La prueba real la calcula un servicio externo opaco. `PlaceholderSynthesizer`
//! lo sustituye: espera una latencia simulada configurable y deriva los
//! digests con BLAKE3, de forma determinista a partir de la entrada.

use std::time::Duration;

use async_trait::async_trait;
use canvas_core::hashing::{hash_bytes, hash_str};
use canvas_core::{Artifact, JobId};
use log::debug;

/// Longitud de cada elemento de la prueba placeholder.
pub const PROOF_ELEMENT_LEN: usize = 7;
/// Número de elementos de la prueba placeholder.
pub const PROOF_ELEMENTS: usize = 3;

/// Entrada de la síntesis. `blob_locator` vacío si la subida falló.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisInput<'a> {
    pub job_id: &'a JobId,
    pub image: &'a str,
    pub blob_locator: &'a str,
}

#[async_trait]
pub trait ProofSynthesizer: Send + Sync {
    async fn synthesize(&self, input: SynthesisInput<'_>) -> Artifact;
}

#[derive(Debug, Clone, Default)]
pub struct PlaceholderSynthesizer {
    delay: Duration,
}

impl PlaceholderSynthesizer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Derivación pura, sin la espera simulada.
    pub fn derive(input: SynthesisInput<'_>) -> Artifact {
        let source_digest = hash_bytes(input.image.as_bytes());
        let dest_digest = hash_str(&format!("{}:{}", input.job_id, input.blob_locator));
        let mut proof_elements = Vec::with_capacity(PROOF_ELEMENTS);
        let mut link = dest_digest.clone();
        for _ in 0..PROOF_ELEMENTS {
            link = hash_str(&link);
            proof_elements.push(link[..PROOF_ELEMENT_LEN].to_string());
        }
        Artifact { source_digest,
                   dest_digest,
                   proof_elements,
                   blob_locator: input.blob_locator.to_string() }
    }
}

#[async_trait]
impl ProofSynthesizer for PlaceholderSynthesizer {
    async fn synthesize(&self, input: SynthesisInput<'_>) -> Artifact {
        if !self.delay.is_zero() {
            debug!("synth: job_id={} simulated latency {:?}", input.job_id, self.delay);
            tokio::time::sleep(self.delay).await;
        }
        Self::derive(input)
    }
}
