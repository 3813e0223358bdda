//! Fachada HTTP.
//!
//! Rutas:
//! - `POST /verify`
//! - `GET /proof_status?imageID=`
//! - `GET /`, `GET /available_contracts`, `GET /health`
//!
//! CORS abierto en todas las rutas. El tope de cuerpo sale de
//! `AppState::max_body_bytes` y reemplaza al de 2 MiB de axum.

pub mod handlers;
pub mod types;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::app::AppState;

fn cors_layer() -> CorsLayer {
    CorsLayer::new().allow_origin(Any)
                    .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

fn body_limit(max_body_bytes: Option<usize>) -> DefaultBodyLimit {
    match max_body_bytes {
        Some(max) => DefaultBodyLimit::max(max),
        None => DefaultBodyLimit::disable(),
    }
}

pub fn router(state: AppState) -> Router {
    let limit = body_limit(state.max_body_bytes);
    Router::new().route("/", get(handlers::index))
                 .route("/available_contracts", get(handlers::available_contracts))
                 .route("/health", get(handlers::health))
                 .route("/verify", post(handlers::verify))
                 .route("/proof_status", get(handlers::proof_status))
                 .layer(limit)
                 .layer(cors_layer())
                 .with_state(state)
}
