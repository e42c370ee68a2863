//! Principal authentication.
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{error, warn};

use crate::repos::user_repo::UserRepo;

#[derive(Debug, Clone, PartialEq)]
pub enum Authentication {
    /// Base claims of the principal: `sub`, `name`, `email`, `groups`, `roles`.
    Authenticated(Map<String, Value>),
    Rejected,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication backend unavailable: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<Authentication, AuthError>;
}

/// Users file authenticator. Passwords are stored as SHA-256 hex digests.
#[derive(Clone, Debug)]
pub struct FileAuthenticator {
    users: UserRepo,
}

impl FileAuthenticator {
    pub fn new(users: UserRepo) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for FileAuthenticator {
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Authentication, AuthError> {
        let user = match self.users.find(username).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(username, "user not found in users file");
                return Ok(Authentication::Rejected);
            }
            Err(e) => {
                error!(path = %self.users.path().display(), error = %e, "failed to read users file");
                return Err(AuthError::Backend(e.to_string()));
            }
        };

        if !digest_matches(&user.password, password) {
            warn!(username, "invalid password");
            return Ok(Authentication::Rejected);
        }

        let mut claims = Map::new();
        claims.insert("sub".into(), json!(username));
        claims.insert(
            "name".into(),
            json!(user.name.as_deref().unwrap_or(username)),
        );
        claims.insert("email".into(), json!(user.email));
        claims.insert("groups".into(), json!(user.groups));
        claims.insert("roles".into(), json!(user.roles));
        Ok(Authentication::Authenticated(claims))
    }
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

// Compare every byte so the time taken does not depend on the mismatch position.
fn digest_matches(stored_hex: &str, password: &str) -> bool {
    let computed = hash_password(password);
    let stored = stored_hex.trim().to_ascii_lowercase();
    if stored.len() != computed.len() {
        return false;
    }
    stored
        .bytes()
        .zip(computed.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

/// Team derived from group membership, exposed to claim providers as `team_id`.
pub fn team_id_for_groups(groups: &[String]) -> &'static str {
    let has = |name: &str| groups.iter().any(|g| g == name);
    if has("administrators") || has("admins") {
        "admin-team"
    } else if has("ai-team") {
        "ai-team"
    } else if has("ml-team") {
        "ml-team"
    } else {
        "general-users"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authenticator() -> (tempfile::TempDir, FileAuthenticator) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.yaml");
        let body = format!(
            "alice:\n  password: {}\n  name: Alice\n  email: alice@example.com\n  groups: [admins]\n  roles: [admin]\nbob:\n  password: {}\n",
            hash_password("wonderland"),
            hash_password("builder").to_uppercase(),
        );
        std::fs::write(&path, body).unwrap();
        (dir, FileAuthenticator::new(UserRepo::new(path)))
    }

    #[tokio::test]
    async fn valid_credentials_yield_base_claims() {
        let (_dir, auth) = authenticator();
        let Authentication::Authenticated(claims) =
            auth.authenticate("alice", "wonderland").await.unwrap()
        else {
            panic!("expected authenticated");
        };
        assert_eq!(claims["sub"], "alice");
        assert_eq!(claims["name"], "Alice");
        assert_eq!(claims["groups"], json!(["admins"]));

        let Authentication::Authenticated(claims) =
            auth.authenticate("bob", "builder").await.unwrap()
        else {
            panic!("expected authenticated");
        };
        assert_eq!(claims["name"], "bob");
        assert_eq!(claims["email"], "");
    }

    #[tokio::test]
    async fn wrong_credentials_are_rejected() {
        let (_dir, auth) = authenticator();
        assert_eq!(
            auth.authenticate("alice", "nope").await.unwrap(),
            Authentication::Rejected
        );
        assert_eq!(
            auth.authenticate("carol", "x").await.unwrap(),
            Authentication::Rejected
        );

        let missing = FileAuthenticator::new(UserRepo::new("/nonexistent/users.yaml"));
        assert!(missing.authenticate("alice", "wonderland").await.is_err());
    }

    #[test]
    fn team_mapping() {
        let groups = |g: &[&str]| g.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(team_id_for_groups(&groups(&["administrators"])), "admin-team");
        assert_eq!(team_id_for_groups(&groups(&["ml-team", "ai-team"])), "ai-team");
        assert_eq!(team_id_for_groups(&groups(&["ml-team"])), "ml-team");
        assert_eq!(team_id_for_groups(&groups(&[])), "general-users");
    }
}
