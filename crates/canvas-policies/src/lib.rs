//! canvas-policies – política de admisión sobre los logs de interacción.
//!
//! La heurística es deliberadamente tosca: cuenta apariciones (sin distinguir
//! mayúsculas) de un marcador asociado a contenido pegado y rechaza cuando
//! `(hits * 5) / 4 >= len(logs)`. La fórmula se conserva tal cual, en
//! aritmética entera y sobre la longitud en bytes del texto original.
//!
//! Con el marcador por defecto (`"paste"`, 5 bytes) ningún texto no vacío
//! puede alcanzar el umbral: cada aparición aporta 5 bytes de longitud y sólo
//! 1.25 al conteo escalado. El marcador es configurable precisamente para que
//! el umbral sea alcanzable en despliegues que lo necesiten.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marcador por defecto.
pub const DEFAULT_MARKER: &str = "paste";

/// Numerador/denominador del escalado de hits.
pub const SCALE_NUM: usize = 5;
pub const SCALE_DEN: usize = 4;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("admission rejected: {scaled_hits} scaled marker hits >= {text_len} log bytes")]
    AdmissionRejected { scaled_hits: usize, text_len: usize },
}

/// Resultado auditable de evaluar unos logs.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub accepted: bool,
    pub marker_hits: usize,
    pub scaled_hits: usize,
    pub text_len: usize,
}

impl AdmissionDecision {
    pub fn into_result(self) -> Result<Self, PolicyError> {
        if self.accepted {
            Ok(self)
        } else {
            Err(PolicyError::AdmissionRejected { scaled_hits: self.scaled_hits,
                                                 text_len: self.text_len })
        }
    }
}

/// Contrato de una política de admisión.
pub trait AdmissionPolicy: Send + Sync {
    /// id estático de la política (para logs).
    fn policy_id(&self) -> &str;

    fn evaluate(&self, log_text: &str) -> AdmissionDecision;

    fn is_legitimate(&self, log_text: &str) -> bool {
        self.evaluate(log_text).accepted
    }
}

/// Política "ratio de pegado".
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasteRatioPolicy {
    marker: String,
}

impl Default for PasteRatioPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl PasteRatioPolicy {
    pub fn new(marker: impl Into<String>) -> Self {
        Self { marker: marker.into() }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl AdmissionPolicy for PasteRatioPolicy {
    fn policy_id(&self) -> &str {
        "paste_ratio_v1"
    }

    fn evaluate(&self, log_text: &str) -> AdmissionDecision {
        let text_len = log_text.len();
        let marker_hits = count_occurrences(log_text, &self.marker);
        let scaled_hits = (marker_hits * SCALE_NUM) / SCALE_DEN;
        // texto vacío: legítimo por definición (0 >= 0 lo rechazaría)
        let accepted = text_len == 0 || scaled_hits < text_len;
        AdmissionDecision { accepted,
                            marker_hits,
                            scaled_hits,
                            text_len }
    }
}

/// Cuenta apariciones sin distinguir mayúsculas, con solapamiento, probando
/// cada offset del texto en minúsculas.
pub fn count_occurrences(text: &str, marker: &str) -> usize {
    if marker.is_empty() {
        return 0;
    }
    let text = text.to_lowercase();
    let marker = marker.to_lowercase();
    text.as_bytes()
        .windows(marker.len())
        .filter(|w| *w == marker.as_bytes())
        .count()
}

/// Atajo con la política por defecto.
pub fn is_legitimate(log_text: &str) -> bool {
    PasteRatioPolicy::default().is_legitimate(log_text)
}
