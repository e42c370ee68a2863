/*
 * Responsibility
 * - POST /generate-jwe-key, /encrypt-jwe, /decrypt-jwe
 * - request の鍵/アルゴリズム指定がなければ server 設定 (JWE_*) を使う
 */
use axum::Json;
use axum::extract::State;

use crate::api::v1::dto::jwe::{
    DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse, GenerateKeyRequest,
    GenerateKeyResponse,
};
use crate::error::AppError;
use crate::services::jwe::{
    ContentEncryption, EncryptionKey, JweEnvelope, KeyExportFormat, KeyFormat, generate_key,
};
use crate::state::{AppState, JweDefaults};

/// Build an envelope from request overrides, falling back to server defaults.
pub fn envelope_for(
    defaults: &JweDefaults,
    encryption_key: Option<&str>,
    encryption: Option<&str>,
    compression: Option<&str>,
) -> Result<JweEnvelope, AppError> {
    let key = encryption_key
        .filter(|k| !k.trim().is_empty())
        .or(defaults.encryption_key.as_deref())
        .ok_or_else(|| {
            AppError::bad_request(
                "MISSING_ENCRYPTION_KEY",
                "No encryption key provided and JWE_ENCRYPTION_KEY is not configured",
            )
        })?;
    let enc = encryption
        .filter(|e| !e.trim().is_empty())
        .unwrap_or(defaults.content_encryption.name());
    let zip = compression.or(defaults.compression.map(|c| c.name()));

    Ok(JweEnvelope::from_encoded(key, enc, zip)?)
}

pub async fn generate_jwe_key(
    body: Option<Json<GenerateKeyRequest>>,
) -> Result<Json<GenerateKeyResponse>, AppError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let algorithm: ContentEncryption = match req.algorithm.as_deref() {
        Some(name) => name.parse()?,
        None => ContentEncryption::default(),
    };
    let format: KeyExportFormat = req.format.as_deref().unwrap_or("base64").parse()?;

    let (encryption_key, format_name) = match format {
        KeyExportFormat::Base64 => (generate_key(algorithm, KeyFormat::Base64)?, "base64"),
        KeyExportFormat::Hex => (generate_key(algorithm, KeyFormat::Hex)?, "hex"),
        KeyExportFormat::Jwk => (
            EncryptionKey::generate(algorithm)?.export(KeyExportFormat::Jwk),
            "jwk",
        ),
    };

    Ok(Json(GenerateKeyResponse {
        encryption_key,
        algorithm: algorithm.name(),
        format: format_name,
    }))
}

pub async fn encrypt_jwe(
    State(state): State<AppState>,
    Json(req): Json<EncryptRequest>,
) -> Result<Json<EncryptResponse>, AppError> {
    let envelope = envelope_for(
        &state.jwe,
        req.encryption_key.as_deref(),
        req.encryption.as_deref(),
        req.compression.as_deref(),
    )?;

    let jwe_token = match (req.token.as_deref(), &req.payload) {
        (Some(token), _) if !token.is_empty() => envelope.encrypt_token(token)?,
        (_, Some(payload)) => envelope.encrypt(payload)?,
        _ => {
            return Err(AppError::bad_request(
                "MISSING_PAYLOAD",
                "Either token or payload must be provided",
            ));
        }
    };

    Ok(Json(EncryptResponse {
        jwe_token,
        encryption: envelope.algorithm().name(),
        compression: envelope.compression().map(|c| c.name()),
    }))
}

pub async fn decrypt_jwe(
    State(state): State<AppState>,
    Json(req): Json<DecryptRequest>,
) -> Result<Json<DecryptResponse>, AppError> {
    let jwe_token = req
        .jwe_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("MISSING_TOKEN", "Missing jwe_token"))?;

    // The zip header travels with the token, so no compression is needed here.
    let envelope = envelope_for(
        &state.jwe,
        req.encryption_key.as_deref(),
        req.encryption.as_deref(),
        None,
    )?;

    let out = if req.extract_jwt.unwrap_or(true) {
        DecryptResponse::Jwt {
            jwt_token: envelope.decrypt_token(jwe_token)?,
        }
    } else {
        DecryptResponse::Payload {
            payload: envelope.decrypt(jwe_token)?,
        }
    };

    Ok(Json(out))
}
