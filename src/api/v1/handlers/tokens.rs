/*
 * Responsibility
 * - POST /refresh (refresh token 必須), GET /protected (access token 必須)
 * - POST /decode, /validate (token を body で受け取る)
 */
use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::api::v1::dto::token::{
    DecodeResponse, ProtectedResponse, RefreshResponse, TokenBody, ValidateResponse,
};
use crate::api::v1::extractors::AuthCtxExtractor;
use crate::error::AppError;
use crate::state::AppState;

pub async fn refresh(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> Result<Json<RefreshResponse>, AppError> {
    debug!(
        sub = %ctx.subject,
        kind = ctx.kind.as_str(),
        jti = ?ctx.jti,
        "refreshing access token"
    );
    let access_token = state.tokens.refresh(&ctx.subject).map_err(|e| {
        tracing::error!(error = %e, "failed to refresh access token");
        AppError::Internal
    })?;
    Ok(Json(RefreshResponse { access_token }))
}

pub async fn protected(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<ProtectedResponse> {
    Json(ProtectedResponse {
        logged_in_as: ctx.subject,
    })
}

pub async fn decode(
    State(state): State<AppState>,
    Json(body): Json<TokenBody>,
) -> Result<Json<DecodeResponse>, AppError> {
    let token = body
        .token()
        .ok_or_else(|| AppError::bad_request("MISSING_TOKEN", "Missing token"))?;
    Ok(Json(state.tokens.jwt().verify(token)?))
}

/// Reports on a token instead of failing: signature first, then expiry.
pub async fn validate(
    State(state): State<AppState>,
    Json(body): Json<TokenBody>,
) -> Result<Json<ValidateResponse>, AppError> {
    let token = body
        .token()
        .ok_or_else(|| AppError::bad_request("MISSING_TOKEN", "Missing token"))?;

    let claims = match state.tokens.jwt().inspect(token) {
        Ok(claims) => claims,
        Err(e) => {
            return Ok(Json(ValidateResponse {
                error: Some(e.to_string()),
                ..Default::default()
            }));
        }
    };

    let exp = claims.get("exp").and_then(Value::as_i64);
    let expired = exp.is_none_or(|exp| exp <= Utc::now().timestamp());

    Ok(Json(ValidateResponse {
        valid: !expired,
        signature_verified: true,
        expired,
        expiry_time: exp.and_then(to_rfc3339),
        issued_at: claims.get("iat").and_then(Value::as_i64).and_then(to_rfc3339),
        subject: claims.get("sub").and_then(Value::as_str).map(str::to_string),
        error: expired.then(|| "Token has expired".to_string()),
    }))
}

fn to_rfc3339(ts: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(ts, 0).map(|t| t.to_rfc3339())
}
