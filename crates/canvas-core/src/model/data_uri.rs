use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::constants::{BASE64_MARKER, DATA_URI_SCHEME};

/// Vista prestada de un data-URI `data:<mime>;base64,<cuerpo>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataUri<'a> {
    pub mime: &'a str,
    pub body: &'a str,
}

impl<'a> DataUri<'a> {
    /// Separa mime y cuerpo. Devuelve `None` si el string no tiene forma de
    /// data-URI base64.
    pub fn split(input: &'a str) -> Option<Self> {
        let rest = input.strip_prefix(DATA_URI_SCHEME)?;
        let (mime, body) = rest.split_once(BASE64_MARKER)?;
        Some(Self { mime, body })
    }

    /// Decodifica el cuerpo con el alfabeto base64 estándar.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.body)
    }
}
