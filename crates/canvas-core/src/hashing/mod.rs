//! Módulo de hashing: fingerprint de contenido y hashes auxiliares.

pub mod fingerprint;
pub mod hash;

pub use fingerprint::{fingerprint, fingerprint_image};
pub use hash::{hash_bytes, hash_str};
