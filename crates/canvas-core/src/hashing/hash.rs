//! Hash helpers BLAKE3 – usados para derivar digests auxiliares del artifact
//! (no para la identidad del job, que es SHA-256).

use blake3::Hasher;

/// Hashea un string y devuelve hex.
pub fn hash_str(input: &str) -> String {
    hash_bytes(input.as_bytes())
}

/// Hashea bytes arbitrarios y devuelve hex (64 caracteres).
pub fn hash_bytes(input: &[u8]) -> String {
    let mut h = Hasher::new();
    h.update(input);
    h.finalize().to_hex().to_string()
}
