/*
 * Responsibility
 * - token 発行 / refresh / decode / validate の request/response DTO
 */
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::services::claims::ApiKeyConfig;

/// Request body for `/token`.
///
/// - `api_key_config` (inline record) wins over `api_key`; with neither the
///   base record applies.
/// - `encrypt: true` additionally wraps the access token in a JWE.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub api_key: Option<String>,
    pub api_key_config: Option<ApiKeyConfig>,

    pub encrypt: bool,
    pub encryption_key: Option<String>,
    pub encryption: Option<String>,
    pub compression: Option<String>,
}

impl TokenRequest {
    pub fn credentials(&self) -> Result<(&str, &str), &'static str> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p)),
            _ => Err("Missing username or password"),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Usually "Bearer"
    pub token_type: &'static str,
    /// Seconds until the access token expires.
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwe_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Body of `/decode` and `/validate`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenBody {
    pub token: Option<String>,
}

impl TokenBody {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }
}

pub type DecodeResponse = Map<String, Value>;

#[derive(Debug, Default, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub signature_verified: bool,
    pub expired: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProtectedResponse {
    pub logged_in_as: String,
}
