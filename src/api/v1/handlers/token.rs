/*
 * Responsibility
 * - POST /token: 認証 → claims 解決 → access/refresh token 発行 (必要なら JWE で包む)
 */
use axum::Json;
use axum::extract::State;
use serde_json::{Map, Value, json};
use tracing::{error, info};

use crate::api::v1::dto::token::{TokenRequest, TokenResponse};
use crate::api::v1::handlers::jwe::envelope_for;
use crate::error::AppError;
use crate::services::auth::Authentication;
use crate::services::auth::authenticator::team_id_for_groups;
use crate::services::claims::ConfigSource;
use crate::state::AppState;

pub async fn issue_token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let (username, password) = req
        .credentials()
        .map_err(|msg| AppError::bad_request("MISSING_CREDENTIALS", msg))?;

    // Reject bad encryption parameters before doing any work.
    let envelope = if req.encrypt {
        Some(envelope_for(
            &state.jwe,
            req.encryption_key.as_deref(),
            req.encryption.as_deref(),
            req.compression.as_deref(),
        )?)
    } else {
        None
    };

    let auth_claims = match state.authenticator.authenticate(username, password).await {
        Ok(Authentication::Authenticated(claims)) => claims,
        Ok(Authentication::Rejected) => {
            return Err(AppError::unauthorized("Invalid username or password"));
        }
        Err(e) => {
            error!(username, error = %e, "authentication failed");
            return Err(AppError::unauthorized("Invalid username or password"));
        }
    };

    let user_context = user_context(username, &auth_claims);
    let source = ConfigSource::select(req.api_key_config.clone(), req.api_key.as_deref());
    let resolved = state.claims.resolve(source, auth_claims, &user_context).await;

    let pair = state
        .tokens
        .issue_token_pair(username, &resolved.claims, resolved.exp_hours)
        .map_err(|e| {
            error!(username, error = %e, "failed to issue tokens");
            AppError::Internal
        })?;

    let jwe_token = match envelope {
        Some(envelope) => Some(envelope.encrypt_token(&pair.access_token)?),
        None => None,
    };

    info!(
        username,
        encrypted = jwe_token.is_some(),
        expires_in = pair.expires_in,
        "token issued"
    );

    Ok(Json(TokenResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: pair.token_type,
        expires_in: pair.expires_in,
        jwe_token,
    }))
}

/// Context visible to claim providers; never embedded in the token as such.
fn user_context(username: &str, auth_claims: &Map<String, Value>) -> Map<String, Value> {
    let groups: Vec<String> = auth_claims
        .get("groups")
        .and_then(Value::as_array)
        .map(|g| g.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let mut ctx = Map::new();
    ctx.insert("user_id".into(), json!(username));
    ctx.insert(
        "email".into(),
        auth_claims.get("email").cloned().unwrap_or(json!("")),
    );
    ctx.insert(
        "roles".into(),
        auth_claims.get("roles").cloned().unwrap_or(json!([])),
    );
    ctx.insert("team_id".into(), json!(team_id_for_groups(&groups)));
    ctx.insert("groups".into(), json!(groups));
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_context_derives_team() {
        let claims = json!({ "sub": "alice", "groups": ["ml-team"], "email": "a@x" })
            .as_object()
            .cloned()
            .unwrap();
        let ctx = user_context("alice", &claims);
        assert_eq!(ctx["user_id"], "alice");
        assert_eq!(ctx["team_id"], "ml-team");
        assert_eq!(ctx["groups"], json!(["ml-team"]));
        assert_eq!(ctx["roles"], json!([]));
    }
}
