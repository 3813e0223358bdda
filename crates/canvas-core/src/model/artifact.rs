//! Artifact producido por un job.
//!
//! Un `Artifact` se crea una sola vez por job (lo escribe el worker) y no se
//! modifica después. Los nombres serializados (`sourceHash`, `destHash`,
//! `proof`, `walrusURI`) son el contrato JSON que consumen los clientes y el
//! formato de los registros persistidos.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(rename = "sourceHash", default)]
    pub source_digest: String,
    #[serde(rename = "destHash", default)]
    pub dest_digest: String,
    #[serde(rename = "proof", default)]
    pub proof_elements: Vec<String>,
    /// Localizador del blob subido; vacío si la subida falló.
    #[serde(rename = "walrusURI", default)]
    pub blob_locator: String,
}

impl Artifact {
    /// Artifact en blanco que se devuelve mientras el job no está probado.
    pub fn blank() -> Self {
        Self::default()
    }

    pub fn has_blob(&self) -> bool {
        !self.blob_locator.is_empty()
    }
}

/// Estado de prueba observable por el cliente (derivado, no almacenado).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Unproven,
    Proven,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_wire_field_names() {
        let art = Artifact { source_digest: "s".into(),
                             dest_digest: "d".into(),
                             proof_elements: vec!["p1".into()],
                             blob_locator: "https://agg/v1/blob".into() };
        let v = serde_json::to_value(&art).unwrap();
        assert_eq!(v,
                   json!({"sourceHash": "s", "destHash": "d", "proof": ["p1"], "walrusURI": "https://agg/v1/blob"}));
    }

    #[test]
    fn blank_artifact_has_empty_fields() {
        let v = serde_json::to_value(Artifact::blank()).unwrap();
        assert_eq!(v, json!({"sourceHash": "", "destHash": "", "proof": [], "walrusURI": ""}));
        assert!(!Artifact::blank().has_blob());
    }

    #[test]
    fn missing_locator_defaults_to_empty() {
        let art: Artifact = serde_json::from_value(json!({"sourceHash": "a", "destHash": "b", "proof": []})).unwrap();
        assert_eq!(art.blob_locator, "");
    }

    #[test]
    fn proof_status_is_lowercase() {
        assert_eq!(serde_json::to_value(ProofStatus::Proven).unwrap(), json!("proven"));
        assert_eq!(serde_json::to_value(ProofStatus::Unproven).unwrap(), json!("unproven"));
    }
}
