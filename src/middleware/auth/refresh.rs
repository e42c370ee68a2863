use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::TokenKind;
use crate::state::AppState;

/// refresh token を要求する route 群に middleware を適用する。
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.route_layer(middleware::from_fn_with_state(state, refresh_middleware))
}

async fn refresh_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_ctx = super::verify(state.tokens.jwt(), req.headers(), TokenKind::Refresh)?;
    req.extensions_mut().insert(auth_ctx);
    Ok(next.run(req).await)
}
