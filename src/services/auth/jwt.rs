use std::{error::Error as StdError, fmt};

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};
use tracing::error;
use uuid::Uuid;

/// Registered claims written by the issuer. They win over additional claims.
const REGISTERED_CLAIMS: [&str; 6] = ["sub", "iat", "nbf", "exp", "jti", "type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

// Errors returned by token signing and verification.
#[derive(Debug)]
pub enum JwtError {
    Jwt(jsonwebtoken::errors::Error),
    WrongKind { expected: TokenKind },
    MissingSubject,
    InvalidLifetime,
}

impl fmt::Display for JwtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jwt(e) => write!(f, "{}", e),
            Self::WrongKind { expected } => {
                write!(f, "only {} tokens are allowed", expected.as_str())
            }
            Self::MissingSubject => write!(f, "missing 'sub' claim"),
            Self::InvalidLifetime => write!(f, "token lifetime out of range"),
        }
    }
}

impl StdError for JwtError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Jwt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Jwt(e)
    }
}

impl JwtError {
    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            Self::Jwt(e) if matches!(e.kind(), jsonwebtoken::errors::ErrorKind::ExpiredSignature)
        )
    }
}

/// HS256 signer/verifier over a shared secret.
///
/// - Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    inspection: Validation,
}

impl std::fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JwtIssuer")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtIssuer {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        // Signature only: used to report on expired tokens.
        let mut inspection = Validation::new(Algorithm::HS256);
        inspection.validate_exp = false;
        inspection.set_required_spec_claims::<&str>(&[]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            inspection,
        }
    }

    /// Sign `claims` plus the registered claims for `sub`.
    pub fn sign(
        &self,
        sub: &str,
        claims: &Map<String, Value>,
        kind: TokenKind,
        ttl_seconds: i64,
    ) -> Result<String, JwtError> {
        let now = Utc::now().timestamp();
        let exp = now
            .checked_add(ttl_seconds)
            .ok_or(JwtError::InvalidLifetime)?;

        let mut payload = claims.clone();
        for name in REGISTERED_CLAIMS {
            payload.remove(name);
        }
        payload.insert("sub".into(), Value::String(sub.to_string()));
        payload.insert("iat".into(), now.into());
        payload.insert("nbf".into(), now.into());
        payload.insert("exp".into(), exp.into());
        payload.insert("jti".into(), Value::String(Uuid::new_v4().to_string()));
        payload.insert("type".into(), Value::String(kind.as_str().to_string()));

        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, &payload, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            JwtError::Jwt(e)
        })
    }

    /// Verify signature and expiry and return every claim.
    pub fn verify(&self, token: &str) -> Result<Map<String, Value>, JwtError> {
        let data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// `verify` + the `type` claim must be `kind`. Returns the subject and claims.
    pub fn verify_kind(
        &self,
        token: &str,
        kind: TokenKind,
    ) -> Result<(String, Map<String, Value>), JwtError> {
        let claims = self.verify(token)?;
        if claims.get("type").and_then(Value::as_str) != Some(kind.as_str()) {
            return Err(JwtError::WrongKind { expected: kind });
        }
        let sub = claims
            .get("sub")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or(JwtError::MissingSubject)?
            .to_string();
        Ok((sub, claims))
    }

    /// Verify the signature only; `exp` is not checked.
    pub fn inspect(&self, token: &str) -> Result<Map<String, Value>, JwtError> {
        let data =
            jsonwebtoken::decode::<Map<String, Value>>(token, &self.decoding_key, &self.inspection)?;
        Ok(data.claims)
    }
}
