use serde_json::Map;
use tracing::debug;

use crate::services::auth::jwt::{JwtError, JwtIssuer, TokenKind};
use crate::services::claims::ClaimMap;

/// Service that issues access/refresh token pairs and refreshes access tokens.
#[derive(Clone, Debug)]
pub struct TokenService {
    jwt: JwtIssuer,
    access_ttl_seconds: u64,
    refresh_ttl_seconds: u64,
}

impl TokenService {
    pub fn new(jwt: JwtIssuer, access_ttl_seconds: u64, refresh_ttl_seconds: u64) -> Self {
        Self {
            jwt,
            access_ttl_seconds,
            refresh_ttl_seconds,
        }
    }

    pub fn jwt(&self) -> &JwtIssuer {
        &self.jwt
    }

    /// Issue a new token pair for an authenticated subject.
    ///
    /// Both tokens carry `claims`. `exp_hours` overrides the access token lifetime.
    pub fn issue_token_pair(
        &self,
        sub: &str,
        claims: &ClaimMap,
        exp_hours: Option<f64>,
    ) -> Result<IssuedTokenPair, JwtError> {
        let access_ttl = match exp_hours {
            Some(hours) => ttl_from_hours(hours)?,
            None => self.access_ttl_seconds as i64,
        };

        debug!(sub, access_ttl, claims = claims.len(), "issuing token pair");

        let access_token = self.jwt.sign(sub, claims, TokenKind::Access, access_ttl)?;
        let refresh_token = self.jwt.sign(
            sub,
            claims,
            TokenKind::Refresh,
            self.refresh_ttl_seconds as i64,
        )?;

        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: access_ttl.max(0) as u64,
        })
    }

    /// New access token for the subject of a verified refresh token.
    /// The refreshed token carries no additional claims.
    pub fn refresh(&self, sub: &str) -> Result<String, JwtError> {
        self.jwt.sign(
            sub,
            &Map::new(),
            TokenKind::Access,
            self.access_ttl_seconds as i64,
        )
    }
}

// Positive and representable in seconds, or an error.
fn ttl_from_hours(hours: f64) -> Result<i64, JwtError> {
    let seconds = (hours * 3600.0).round();
    if hours > 0.0 && seconds < i64::MAX as f64 {
        Ok((seconds as i64).max(1))
    } else {
        Err(JwtError::InvalidLifetime)
    }
}

/// Service-level return type to keep handlers thin.
#[derive(Clone, Debug)]
pub struct IssuedTokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}
