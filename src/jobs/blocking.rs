//! Acceso al registry fuera de los hilos del runtime. El backend fs hace E/S
//! síncrona, así que cada llamada va a `spawn_blocking`.
use std::sync::Arc;

use canvas_core::{ArtifactStore, StoreError};

/// Ejecuta `op` contra el store en el pool de bloqueo. Un pánico o una
/// cancelación de la tarea se reporta como `StoreError::Io`.
pub async fn with_store<T, F>(store: &Arc<dyn ArtifactStore>, op: F) -> Result<T, StoreError>
    where T: Send + 'static,
          F: FnOnce(&dyn ArtifactStore) -> Result<T, StoreError> + Send + 'static
{
    let store = Arc::clone(store);
    match tokio::task::spawn_blocking(move || op(store.as_ref())).await {
        Ok(result) => result,
        Err(e) => Err(StoreError::Io(format!("store task failed: {e}"))),
    }
}
