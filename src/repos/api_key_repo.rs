//! API key configuration records.
//!
//! One YAML document per lookup key: `<dir>/<key>.yaml`, with the fallback
//! record stored as `<dir>/base_api_key.yaml`. Records are read on every
//! call; edits on disk apply to the next request.
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::repos::error::{RepoError, RepoResult};
use crate::services::claims::ApiKeyConfig;

/// File stem of the fallback record.
pub const BASE_API_KEY: &str = "base_api_key";

/// Read-only access to API key configuration records.
///
/// - `Ok(None)`: no record under that key (or the key is not addressable)
/// - `Err(_)`: the record exists but could not be read or parsed
#[async_trait]
pub trait ApiKeyConfigStore: Send + Sync {
    async fn find(&self, key: &str) -> RepoResult<Option<ApiKeyConfig>>;

    async fn find_base(&self) -> RepoResult<Option<ApiKeyConfig>>;
}

#[derive(Clone, Debug)]
pub struct FileApiKeyStore {
    dir: PathBuf,
}

impl FileApiKeyStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Option<PathBuf> {
        is_addressable(key).then(|| self.dir.join(format!("{key}.yaml")))
    }

    async fn load(&self, path: PathBuf) -> RepoResult<Option<ApiKeyConfig>> {
        let raw = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "api key record not found");
                return Ok(None);
            }
            Err(e) => return Err(RepoError::Io(e)),
        };

        // An empty document is a record with every field defaulted.
        if raw.trim().is_empty() {
            return Ok(Some(ApiKeyConfig::default()));
        }

        let config = serde_yaml::from_str::<ApiKeyConfig>(&raw).map_err(|source| {
            RepoError::Yaml {
                path: path.display().to_string(),
                source,
            }
        })?;
        Ok(Some(config))
    }
}

#[async_trait]
impl ApiKeyConfigStore for FileApiKeyStore {
    async fn find(&self, key: &str) -> RepoResult<Option<ApiKeyConfig>> {
        match self.path_for(key) {
            Some(path) => self.load(path).await,
            None => {
                debug!(key, "rejected api key lookup");
                Ok(None)
            }
        }
    }

    async fn find_base(&self) -> RepoResult<Option<ApiKeyConfig>> {
        self.load(self.dir.join(format!("{BASE_API_KEY}.yaml"))).await
    }
}

// Keys name a file inside the records directory and nothing else.
fn is_addressable(key: &str) -> bool {
    !key.is_empty()
        && key != "."
        && !key.contains("..")
        && !key.contains('/')
        && !key.contains('\\')
        && !key.contains('\0')
}
