//! Bearer JWT verification → AuthCtx を extensions に入れる
//!
//! - `access::apply`: access token が必要な route 用
//! - `refresh::apply`: refresh token が必要な route 用 (`/refresh`)
pub mod access;
pub mod refresh;

use axum::http::{HeaderMap, header};
use serde_json::Value;

use crate::api::v1::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{JwtIssuer, TokenKind};

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::unauthorized("Missing Authorization Header"))?;

    auth.strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::unauthorized("Missing 'Bearer' type in 'Authorization' header"))
}

fn verify(jwt: &JwtIssuer, headers: &HeaderMap, kind: TokenKind) -> Result<AuthCtx, AppError> {
    let token = bearer_token(headers)?;

    let (subject, claims) = jwt.verify_kind(token, kind).map_err(|err| {
        tracing::warn!(error = %err, kind = kind.as_str(), "bearer token verification failed");
        if err.is_expired() {
            AppError::unauthorized("Token has expired")
        } else {
            AppError::unauthorized(err.to_string())
        }
    })?;

    let jti = claims.get("jti").and_then(Value::as_str).map(str::to_string);
    Ok(AuthCtx {
        subject,
        kind,
        jti,
    })
}
