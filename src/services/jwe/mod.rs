//! JWE envelope for tokens and arbitrary JSON payloads.
//!
//! - Key management is fixed to `dir` (the shared key is the CEK).
//! - Content encryption: AES-GCM and AES-CBC-HMAC-SHA2 families.
//! - Optional `DEF` compression is recorded in the protected header.
//!
//! Every constructor validates algorithm names and key sizes before any data
//! is processed; decryption fails closed.
mod algorithm;
mod envelope;
mod key;

pub use algorithm::{Compression, ContentEncryption};
pub use envelope::JweEnvelope;
pub use key::{EncryptionKey, KeyExportFormat, KeyFormat, generate_key};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JweError {
    #[error("unsupported content encryption: {0}")]
    UnsupportedAlgorithm(String),

    #[error("unsupported key algorithm: {0}")]
    UnsupportedKeyAlgorithm(String),

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("unsupported key format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid key size: expected {expected} bytes for {algorithm}, got {actual} bytes")]
    InvalidKeySize {
        algorithm: ContentEncryption,
        expected: usize,
        actual: usize,
    },

    #[error("failed to generate key material: {0}")]
    Random(String),

    #[error("malformed JWE: {0}")]
    Malformed(&'static str),

    #[error("JWE was encrypted with {found}, expected {expected}")]
    AlgorithmMismatch { expected: String, found: String },

    #[error("encryption failed: {0}")]
    Encrypt(#[source] josekit::JoseError),

    #[error("decryption failed: {0}")]
    Decrypt(#[source] josekit::JoseError),

    #[error("payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("decrypted payload has no 'jwt' field")]
    MissingJwt,
}

pub type JweResult<T> = Result<T, JweError>;
