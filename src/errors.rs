//! Errores de arranque del servidor y de la capa HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use canvas_adapters::{ProbeError, UploadError};
use canvas_core::StoreError;
use canvas_persistence::PersistenceError;
use log::error;
use thiserror::Error;

use crate::config::ConfigError;

/// Fallos que impiden levantar o mantener el proceso.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration: {0}")] Config(#[from] ConfigError),
    #[error("store: {0}")] Store(#[from] PersistenceError),
    #[error("blob store client: {0}")] BlobClient(#[from] UploadError),
    #[error("prover probe client: {0}")] ProbeClient(#[from] ProbeError),
    #[error("cannot bind {addr}: {source}")] Bind { addr: String, #[source] source: std::io::Error },
    #[error("server error: {0}")] Serve(#[source] std::io::Error),
}

/// Errores de petición. Se responden en texto plano.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("registry unavailable: {0}")] Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(e) => {
                error!("api: {e}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, self.to_string()).into_response()
    }
}
