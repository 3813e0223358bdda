//! Constantes del núcleo.
//!
//! Agrupa valores que forman parte del contrato observable (longitud del
//! `JobId`, separador en los nombres de registro). Cambiarlos rompe la
//! compatibilidad con registros ya escritos en disco.

/// Longitud en caracteres hex de un `JobId` (SHA-256).
pub const JOB_ID_HEX_LEN: usize = 64;

/// Separador entre el `JobId` y el sufijo aleatorio en el nombre de un
/// registro persistido (`<jobID>___<sufijo>`).
pub const RECORD_SEPARATOR: &str = "___";

/// Prefijo común de un data-URI en base64.
pub const DATA_URI_SCHEME: &str = "data:";

/// Marcador que separa el mime del cuerpo base64 en un data-URI.
pub const BASE64_MARKER: &str = ";base64,";
