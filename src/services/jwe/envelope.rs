use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use josekit::jwe::{self, Dir, JweHeader};
use serde_json::Value;
use tracing::{debug, warn};

use super::algorithm::check_key_algorithm;
use super::{Compression, ContentEncryption, EncryptionKey, JweError, JweResult};

/// Authenticated-encryption envelope bound to one key/algorithm pair.
#[derive(Debug, Clone)]
pub struct JweEnvelope {
    key: EncryptionKey,
    compression: Option<Compression>,
}

impl JweEnvelope {
    pub fn new(key: EncryptionKey, compression: Option<Compression>) -> Self {
        Self { key, compression }
    }

    /// Build an envelope from caller-supplied strings.
    ///
    /// Algorithm, compression and key size are all checked here, before any
    /// payload is touched.
    pub fn from_encoded(
        encoded_key: &str,
        content_encryption: &str,
        compression: Option<&str>,
    ) -> JweResult<Self> {
        let algorithm: ContentEncryption = content_encryption.parse()?;
        let compression = Compression::parse_optional(compression)?;
        let key = EncryptionKey::decode(encoded_key, algorithm)?;
        Ok(Self::new(key, compression))
    }

    pub fn algorithm(&self) -> ContentEncryption {
        self.key.algorithm()
    }

    pub fn compression(&self) -> Option<Compression> {
        self.compression
    }

    pub fn encrypt(&self, payload: &Value) -> JweResult<String> {
        let plaintext = serde_json::to_vec(payload)?;

        let mut header = JweHeader::new();
        header.set_content_encryption(self.algorithm().name());
        if let Some(zip) = self.compression {
            header.set_compression(zip.name());
        }

        let encrypter = Dir
            .encrypter_from_bytes(self.key.as_bytes())
            .map_err(JweError::Encrypt)?;
        let token =
            jwe::serialize_compact(&plaintext, &header, &encrypter).map_err(JweError::Encrypt)?;

        debug!(
            enc = %self.algorithm(),
            zip = ?self.compression.map(|c| c.name()),
            "encrypted payload"
        );
        Ok(token)
    }

    pub fn decrypt(&self, token: &str) -> JweResult<Value> {
        let token = token.trim();
        self.check_protected_header(token)?;

        let decrypter = Dir
            .decrypter_from_bytes(self.key.as_bytes())
            .map_err(JweError::Decrypt)?;
        let (plaintext, _header) = jwe::deserialize_compact(token, &decrypter).map_err(|e| {
            warn!(enc = %self.algorithm(), error = %e, "JWE decryption failed");
            JweError::Decrypt(e)
        })?;

        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Wrap a signed JWT as `{"jwt": <token>}`.
    pub fn encrypt_token(&self, jwt: &str) -> JweResult<String> {
        self.encrypt(&serde_json::json!({ "jwt": jwt }))
    }

    pub fn decrypt_token(&self, token: &str) -> JweResult<String> {
        match self.decrypt(token)? {
            Value::Object(mut map) => match map.remove("jwt") {
                Some(Value::String(jwt)) => Ok(jwt),
                _ => Err(JweError::MissingJwt),
            },
            _ => Err(JweError::MissingJwt),
        }
    }

    // Structural checks josekit would not report distinctly: segment layout,
    // `alg` = dir (empty encrypted key) and the expected `enc`.
    fn check_protected_header(&self, token: &str) -> JweResult<()> {
        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 5 {
            return Err(JweError::Malformed("expected 5 segments"));
        }
        if !segments[1].is_empty() {
            return Err(JweError::Malformed("encrypted key must be empty for dir"));
        }

        let raw = URL_SAFE_NO_PAD
            .decode(segments[0])
            .map_err(|_| JweError::Malformed("protected header is not base64url"))?;
        let header: Value = serde_json::from_slice(&raw)
            .map_err(|_| JweError::Malformed("protected header is not JSON"))?;

        let alg = header
            .get("alg")
            .and_then(Value::as_str)
            .ok_or(JweError::Malformed("missing alg"))?;
        check_key_algorithm(alg)?;

        let enc = header
            .get("enc")
            .and_then(Value::as_str)
            .ok_or(JweError::Malformed("missing enc"))?;
        if enc != self.algorithm().name() {
            return Err(JweError::AlgorithmMismatch {
                expected: self.algorithm().name().to_string(),
                found: enc.to_string(),
            });
        }

        Ok(())
    }
}
