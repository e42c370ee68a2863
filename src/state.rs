/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - ex: tokens: TokenService, claims: ClaimsResolver, authenticator など
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::services::auth::{Authenticator, TokenService};
use crate::services::claims::ClaimsResolver;
use crate::services::jwe::{Compression, ContentEncryption};

/// Server-side JWE defaults used when a request does not bring its own key.
#[derive(Clone, Default)]
pub struct JweDefaults {
    pub encryption_key: Option<String>,
    pub content_encryption: ContentEncryption,
    pub compression: Option<Compression>,
}

impl std::fmt::Debug for JweDefaults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("JweDefaults")
            .field("has_key", &self.encryption_key.is_some())
            .field("content_encryption", &self.content_encryption)
            .field("compression", &self.compression)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub authenticator: Arc<dyn Authenticator>,
    pub claims: Arc<ClaimsResolver>,
    pub jwe: JweDefaults,
}

impl AppState {
    pub fn new(
        tokens: Arc<TokenService>,
        authenticator: Arc<dyn Authenticator>,
        claims: Arc<ClaimsResolver>,
        jwe: JweDefaults,
    ) -> Self {
        Self {
            tokens,
            authenticator,
            claims,
            jwe,
        }
    }
}
