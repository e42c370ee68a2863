/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - Middleware の適用 (request-id / trace / limit / timeout, Bearer)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::{Router, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::error::AppError;
use crate::middleware;
use crate::repos::api_key_repo::{ApiKeyConfigStore, FileApiKeyStore};
use crate::services::auth::{build_authenticator, build_token_service};
use crate::services::claims::{ClaimsResolver, DynamicClaimDispatcher, ProviderRegistry};
use crate::services::jwe::EncryptionKey;
use crate::state::{AppState, JweDefaults};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,claimsmith=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // In development, fail fast. In production, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );
    tracing::info!(
        api_keys_dir = %config.api_keys_dir.display(),
        users_file = %config.users_file.display(),
        jwe_default_key = config.jwe_encryption_key.is_some(),
        "claims configuration"
    );

    let state = build_state(&config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn build_state(config: &Config) -> Result<AppState> {
    // Build process-level services here and inject them into the shared application state.
    let registry = Arc::new(ProviderRegistry::with_builtin());
    tracing::debug!(providers = registry.len(), ?registry, "claim providers registered");

    let http = DynamicClaimDispatcher::build_http_client()
        .context("failed to build HTTP client for api claims")?;
    let dispatcher =
        DynamicClaimDispatcher::new(registry, http, config.internal_api_token.clone());

    let store = FileApiKeyStore::new(config.api_keys_dir.clone());
    tracing::debug!(dir = %store.dir().display(), "api key store ready");
    let store: Arc<dyn ApiKeyConfigStore> = Arc::new(store);
    let claims = Arc::new(ClaimsResolver::new(store, dispatcher));

    // A configured server key must fit the configured algorithm.
    if let Some(key) = &config.jwe_encryption_key {
        EncryptionKey::decode(key, config.jwe_content_encryption)
            .context("invalid JWE_ENCRYPTION_KEY")?;
    }
    let jwe = JweDefaults {
        encryption_key: config.jwe_encryption_key.clone(),
        content_encryption: config.jwe_content_encryption,
        compression: config.jwe_compression,
    };

    Ok(AppState::new(
        build_token_service(config),
        build_authenticator(config),
        claims,
        jwe,
    ))
}

pub fn build_router(state: AppState) -> Router {
    async fn not_found() -> AppError {
        AppError::NotFound { resource: "route" }
    }

    let router = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .fallback(not_found)
        .with_state(state);

    middleware::http::apply(router)
}
