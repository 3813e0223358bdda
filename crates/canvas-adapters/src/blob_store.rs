//! Subida del payload de la imagen a un blob store content-addressable.
//!
//! Contrato:
//! - Sólo se aceptan data-URIs PNG o JPEG; cualquier otro prefijo es
//!   `UnsupportedFormat`.
//! - Un único `PUT` sin reintentos ni backoff. El worker no tiene a quién
//!   reportar un fallo: degrada el localizador del artifact a vacío.
//! - Respuesta no-2xx → `UploadFailed` con el cuerpo capturado.
//! - Respuesta 2xx → sobre JSON `alreadyCertified.blobId` o
//!   `newlyCreated.blobObject.blobId`; otra forma → `MalformedResponse`.

use std::time::Duration;

use async_trait::async_trait;
use canvas_core::DataUri;
use log::{debug, info};
use serde::Deserialize;
use thiserror::Error;

/// Prefijos soportados y su `Content-Type`.
pub const SUPPORTED_PREFIXES: &[(&str, &str)] = &[("data:image/png;base64,", "image/png"),
                                                  ("data:image/jpeg;base64,", "image/jpeg"),
                                                  ("data:image/jpg;base64,", "image/jpeg")];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),
    #[error("invalid base64 payload: {0}")]
    InvalidEncoding(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upload failed with status {status}: {body}")]
    UploadFailed { status: u16, body: String },
    #[error("malformed store response: {0}")]
    MalformedResponse(String),
}

/// Localizador de un blob ya almacenado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocator {
    pub blob_id: String,
    /// URI pública de lectura (aggregator + blob id).
    pub uri: String,
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store_blob(&self, bytes: Vec<u8>, content_type: &str) -> Result<BlobLocator, UploadError>;
}

/// Quita el prefijo conocido y decodifica el base64.
pub fn prepare_upload(data_uri: &str) -> Result<(Vec<u8>, &'static str), UploadError> {
    for &(prefix, content_type) in SUPPORTED_PREFIXES {
        if let Some(body) = data_uri.strip_prefix(prefix) {
            let bytes = DataUri { mime: content_type, body }.decode()
                                                             .map_err(|e| UploadError::InvalidEncoding(e.to_string()))?;
            return Ok((bytes, content_type));
        }
    }
    let found = DataUri::split(data_uri).map(|u| u.mime.to_string())
                                        .unwrap_or_else(|| "not a base64 data uri".to_string());
    Err(UploadError::UnsupportedFormat(found))
}

/// Prepara y sube una imagen en data-URI.
pub async fn upload(store: &dyn BlobStore, data_uri: &str) -> Result<BlobLocator, UploadError> {
    let (bytes, content_type) = prepare_upload(data_uri)?;
    debug!("upload: {} bytes content_type={content_type}", bytes.len());
    store.store_blob(bytes, content_type).await
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreEnvelope {
    already_certified: Option<AlreadyCertified>,
    newly_created: Option<NewlyCreated>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlreadyCertified {
    blob_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewlyCreated {
    blob_object: BlobObject,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    blob_id: String,
}

/// Extrae el blob id del sobre JSON del publisher.
pub fn parse_store_envelope(body: &[u8]) -> Result<String, UploadError> {
    let envelope: StoreEnvelope = serde_json::from_slice(body).map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
    if let Some(existing) = envelope.already_certified {
        return Ok(existing.blob_id);
    }
    if let Some(created) = envelope.newly_created {
        return Ok(created.blob_object.blob_id);
    }
    Err(UploadError::MalformedResponse("neither alreadyCertified nor newlyCreated present".into()))
}

/// Cliente HTTP del publisher de Walrus.
#[derive(Debug, Clone)]
pub struct WalrusBlobStore {
    client: reqwest::Client,
    publisher_url: String,
    aggregator_url: String,
    epochs: u32,
}

impl WalrusBlobStore {
    /// `timeout = None` conserva el comportamiento sin límite de tiempo.
    pub fn new(publisher_url: impl Into<String>,
               aggregator_url: impl Into<String>,
               epochs: u32,
               timeout: Option<Duration>)
               -> Result<Self, UploadError> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        let client = builder.build().map_err(|e| UploadError::Transport(e.to_string()))?;
        Ok(Self { client,
                  publisher_url: publisher_url.into(),
                  aggregator_url: aggregator_url.into(),
                  epochs })
    }

    pub fn store_url(&self) -> String {
        format!("{}/v1/store?epochs={}", self.publisher_url.trim_end_matches('/'), self.epochs)
    }

    pub fn locator_for(&self, blob_id: String) -> BlobLocator {
        BlobLocator { uri: format!("{}{}", self.aggregator_url, blob_id),
                      blob_id }
    }
}

#[async_trait]
impl BlobStore for WalrusBlobStore {
    async fn store_blob(&self, bytes: Vec<u8>, content_type: &str) -> Result<BlobLocator, UploadError> {
        let url = self.store_url();
        let resp = self.client
                       .put(url.as_str())
                       .header(reqwest::header::CONTENT_TYPE, content_type)
                       .body(bytes)
                       .send()
                       .await
                       .map_err(|e| UploadError::Transport(format!("{url}: {e}")))?;
        let status = resp.status();
        let body = resp.bytes()
                       .await
                       .map_err(|e| UploadError::Transport(format!("reading body: {e}")))?;
        if !status.is_success() {
            return Err(UploadError::UploadFailed { status: status.as_u16(),
                                                   body: String::from_utf8_lossy(&body).into_owned() });
        }
        let blob_id = parse_store_envelope(&body)?;
        info!("blob stored blob_id={blob_id}");
        Ok(self.locator_for(blob_id))
    }
}
