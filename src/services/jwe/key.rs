use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

use super::{ContentEncryption, JweError, JweResult};

/// Text encodings accepted for generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyFormat {
    #[default]
    Base64,
    Hex,
}

impl KeyFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base64 => "base64",
            Self::Hex => "hex",
        }
    }
}

impl FromStr for KeyFormat {
    type Err = JweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            other => Err(JweError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Export encodings; `Jwk` yields an `oct` JSON Web Key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyExportFormat {
    Base64,
    Hex,
    Jwk,
}

impl FromStr for KeyExportFormat {
    type Err = JweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            "jwk" => Ok(Self::Jwk),
            other => Err(JweError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Symmetric key material validated against a content encryption algorithm.
///
/// Key bytes are intentionally not printable via Debug.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: Vec<u8>,
    algorithm: ContentEncryption,
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("algorithm", &self.algorithm)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl EncryptionKey {
    pub fn from_bytes(bytes: Vec<u8>, algorithm: ContentEncryption) -> JweResult<Self> {
        let expected = algorithm.key_len();
        if bytes.len() != expected {
            return Err(JweError::InvalidKeySize {
                algorithm,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self { bytes, algorithm })
    }

    /// Decode a textual key: base64 first, then hex, then the raw bytes.
    ///
    /// The first decoding whose length matches `algorithm` wins, so a hex key
    /// that also happens to be valid base64 is still accepted.
    pub fn decode(input: &str, algorithm: ContentEncryption) -> JweResult<Self> {
        let expected = algorithm.key_len();
        let candidates = decode_candidates(input.trim());

        let actual = candidates.first().map(Vec::len).unwrap_or_default();
        match candidates.into_iter().find(|c| c.len() == expected) {
            Some(bytes) => Ok(Self { bytes, algorithm }),
            None => Err(JweError::InvalidKeySize {
                algorithm,
                expected,
                actual,
            }),
        }
    }

    pub fn generate(algorithm: ContentEncryption) -> JweResult<Self> {
        let mut bytes = vec![0u8; algorithm.key_len()];
        getrandom::fill(&mut bytes).map_err(|e| JweError::Random(e.to_string()))?;
        Ok(Self { bytes, algorithm })
    }

    pub fn algorithm(&self) -> ContentEncryption {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encode(&self, format: KeyFormat) -> String {
        match format {
            KeyFormat::Base64 => STANDARD.encode(&self.bytes),
            KeyFormat::Hex => hex::encode(&self.bytes),
        }
    }

    pub fn export(&self, format: KeyExportFormat) -> String {
        match format {
            KeyExportFormat::Base64 => self.encode(KeyFormat::Base64),
            KeyExportFormat::Hex => self.encode(KeyFormat::Hex),
            KeyExportFormat::Jwk => serde_json::json!({
                "kty": "oct",
                "k": URL_SAFE_NO_PAD.encode(&self.bytes),
            })
            .to_string(),
        }
    }
}

/// Generate a fresh random key for `algorithm`, encoded as requested.
pub fn generate_key(algorithm: ContentEncryption, format: KeyFormat) -> JweResult<String> {
    Ok(EncryptionKey::generate(algorithm)?.encode(format))
}

fn decode_candidates(input: &str) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(4);
    if let Ok(b) = STANDARD.decode(input) {
        out.push(b);
    }
    if let Ok(b) = URL_SAFE_NO_PAD.decode(input.trim_end_matches('=')) {
        out.push(b);
    }
    if let Ok(b) = hex::decode(input) {
        out.push(b);
    }
    out.push(input.as_bytes().to_vec());
    out
}
