/*
 * Responsibility
 * - JWE 鍵生成 / 暗号化 / 復号の request/response DTO
 */
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct GenerateKeyRequest {
    pub algorithm: Option<String>,
    /// `base64` (default), `hex` or `jwk`
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateKeyResponse {
    pub encryption_key: String,
    pub algorithm: &'static str,
    pub format: &'static str,
}

/// Either `token` (wrapped as `{"jwt": token}`) or an arbitrary `payload`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EncryptRequest {
    pub token: Option<String>,
    pub payload: Option<Value>,
    pub encryption_key: Option<String>,
    pub encryption: Option<String>,
    pub compression: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EncryptResponse {
    pub jwe_token: String,
    pub encryption: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression: Option<&'static str>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DecryptRequest {
    pub jwe_token: Option<String>,
    pub encryption_key: Option<String>,
    pub encryption: Option<String>,
    /// Defaults to true: return the wrapped `jwt` rather than the raw payload.
    pub extract_jwt: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum DecryptResponse {
    Jwt { jwt_token: String },
    Payload { payload: Value },
}
