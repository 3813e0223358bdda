//! trueCanvas: servicio de verificación de contenido.
//!
//! Este crate arma el servidor HTTP sobre los crates del workspace:
//! - `config`: configuración desde entorno (.env incluido).
//! - `jobs`: tabla de jobs, pool acotado y worker en segundo plano.
//! - `api`: rutas axum (`/verify`, `/proof_status` y auxiliares).
//! - `app`: estado compartido y su cableado.
//! - `errors`: errores de arranque y de petición.

pub mod api;
pub mod app;
pub mod config;
pub mod errors;
pub mod jobs;

pub use app::{AppParts, AppState};
pub use config::AppConfig;
