/*
 * Responsibility
 * - 環境変数 (.env 含む) からの設定読み込み
 * - 設定値のバリデーション (不足・不正なら起動失敗)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::services::jwe::{Compression, ContentEncryption};

const DEV_JWT_SECRET: &str = "dev-secret-key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,

    // HS256 signing secret
    pub jwt_secret_key: String,
    // Token lifetimes (seconds)
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,

    pub api_keys_dir: PathBuf,
    pub users_file: PathBuf,
    // Substituted for `{internal_token}` in api claim headers
    pub internal_api_token: String,

    pub jwe_encryption_key: Option<String>,
    pub jwe_content_encryption: ContentEncryption,
    pub jwe_compression: Option<Compression>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Do not print secrets
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("access_token_ttl_seconds", &self.access_token_ttl_seconds)
            .field("refresh_token_ttl_seconds", &self.refresh_token_ttl_seconds)
            .field("api_keys_dir", &self.api_keys_dir)
            .field("users_file", &self.users_file)
            .field("jwe_content_encryption", &self.jwe_content_encryption)
            .field("jwe_compression", &self.jwe_compression)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let jwt_secret_key = match non_empty_var("JWT_SECRET_KEY") {
            Some(secret) => secret,
            None if app_env.is_production() => return Err(ConfigError::Missing("JWT_SECRET_KEY")),
            None => DEV_JWT_SECRET.to_string(),
        };

        let access_token_ttl_seconds = std::env::var("ACCESS_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3600); // 1 hour
        let refresh_token_ttl_seconds = std::env::var("REFRESH_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2_592_000); // 30 days

        let api_keys_dir = PathBuf::from(
            std::env::var("API_KEYS_DIR").unwrap_or_else(|_| "config/api_keys".to_string()),
        );
        let users_file = PathBuf::from(
            std::env::var("USERS_FILE").unwrap_or_else(|_| "config/users.yaml".to_string()),
        );
        let internal_api_token = std::env::var("INTERNAL_API_TOKEN").unwrap_or_default();

        let jwe_encryption_key = non_empty_var("JWE_ENCRYPTION_KEY");
        let jwe_content_encryption = match non_empty_var("JWE_CONTENT_ENCRYPTION") {
            Some(name) => name
                .parse::<ContentEncryption>()
                .map_err(|_| ConfigError::Invalid("JWE_CONTENT_ENCRYPTION"))?,
            None => ContentEncryption::default(),
        };
        let jwe_compression = Compression::parse_optional(non_empty_var("JWE_COMPRESSION").as_deref())
            .map_err(|_| ConfigError::Invalid("JWE_COMPRESSION"))?;

        Ok(Self {
            addr,
            app_env,
            jwt_secret_key,
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            api_keys_dir,
            users_file,
            internal_api_token,
            jwe_encryption_key,
            jwe_content_encryption,
            jwe_compression,
        })
    }

    /// Defaults for tests: development mode, no server-side JWE key.
    #[cfg(test)]
    pub fn for_tests(api_keys_dir: PathBuf, users_file: PathBuf) -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            app_env: AppEnv::Development,
            jwt_secret_key: "test-secret".to_string(),
            access_token_ttl_seconds: 3600,
            refresh_token_ttl_seconds: 2_592_000,
            api_keys_dir,
            users_file,
            internal_api_token: "internal".to_string(),
            jwe_encryption_key: None,
            jwe_content_encryption: ContentEncryption::default(),
            jwe_compression: None,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
