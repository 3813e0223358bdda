//! Fingerprint de contenido → `JobId`.
//!
//! La identidad de un job depende únicamente del contenido de la imagen (nunca
//! de los logs). Si la imagen llega como data-URI base64 bien formado el hash
//! se calcula sobre los bytes decodificados; en cualquier otro caso sobre los
//! bytes crudos del string recibido.

use sha2::{Digest, Sha256};

use crate::model::{DataUri, JobId};

/// SHA-256 del contenido, codificado en hex minúsculas.
pub fn fingerprint(content: &[u8]) -> JobId {
    let digest = Sha256::digest(content);
    JobId::from_digest_hex(format!("{digest:x}"))
}

/// Fingerprint de una imagen recibida como string (data-URI o texto crudo).
pub fn fingerprint_image(image: &str) -> JobId {
    match DataUri::split(image).and_then(|uri| uri.decode().ok()) {
        Some(decoded) => fingerprint(&decoded),
        None => fingerprint(image.as_bytes()),
    }
}
