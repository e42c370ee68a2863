/// Factory: build the auth services from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::repos::user_repo::UserRepo;
use crate::services::auth::{Authenticator, FileAuthenticator, JwtIssuer, TokenService};

pub fn build_token_service(config: &Config) -> Arc<TokenService> {
    let jwt = JwtIssuer::new(&config.jwt_secret_key);
    Arc::new(TokenService::new(
        jwt,
        config.access_token_ttl_seconds,
        config.refresh_token_ttl_seconds,
    ))
}

pub fn build_authenticator(config: &Config) -> Arc<dyn Authenticator> {
    Arc::new(FileAuthenticator::new(UserRepo::new(&config.users_file)))
}
