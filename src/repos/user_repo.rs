/*
 * Responsibility
 * - users YAML (username -> record) の読み込み
 * - 呼び出しごとに再読込 (キャッシュなし)
 */
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::repos::error::{RepoError, RepoResult};

/// One entry of the users file. `password` is a lowercase SHA-256 hex digest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub password: String,
    pub name: Option<String>,
    pub email: String,
    pub groups: Vec<String>,
    pub roles: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct UserRepo {
    path: PathBuf,
}

impl UserRepo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn find(&self, username: &str) -> RepoResult<Option<UserRecord>> {
        let raw = tokio::fs::read_to_string(&self.path).await?;
        if raw.trim().is_empty() {
            return Ok(None);
        }

        let mut users: HashMap<String, UserRecord> =
            serde_yaml::from_str(&raw).map_err(|source| RepoError::Yaml {
                path: self.path.display().to_string(),
                source,
            })?;

        Ok(users.remove(username))
    }
}
