/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware が JWT を検証して request extensions に格納し、handler はこの型だけを受け取る
 */
use crate::services::auth::TokenKind;

/// 検証済みの Bearer token に付随するコンテキスト
///
/// - `subject` は JWT の `sub` (username)
/// - `kind` は middleware が要求した token 種別 (access / refresh)
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub subject: String,
    pub kind: TokenKind,
    pub jti: Option<String>,
}
