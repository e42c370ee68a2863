/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - Bearer が必要な範囲 (/protected: access, /refresh: refresh) に route_layer を適用
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{
    jwe::{decrypt_jwe, encrypt_jwe, generate_jwe_key},
    token::issue_token,
    tokens::{decode, protected, refresh, validate},
};
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/token", post(issue_token))
        .route("/decode", post(decode))
        .route("/validate", post(validate))
        .route("/generate-jwe-key", post(generate_jwe_key))
        .route("/encrypt-jwe", post(encrypt_jwe))
        .route("/decrypt-jwe", post(decrypt_jwe));

    let access_routes = middleware::auth::access::apply(
        Router::new().route("/protected", get(protected)),
        state.clone(),
    );
    let refresh_routes = middleware::auth::refresh::apply(
        Router::new().route("/refresh", post(refresh)),
        state,
    );

    public.merge(access_routes).merge(refresh_routes)
}
