use std::fmt;
use std::str::FromStr;

use super::JweError;

/// The only supported key management mode.
pub const KEY_MANAGEMENT_ALGORITHM: &str = "dir";

/// Content encryption algorithms (`enc`) and their CEK sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentEncryption {
    A128Gcm,
    A192Gcm,
    #[default]
    A256Gcm,
    A128CbcHs256,
    A192CbcHs384,
    A256CbcHs512,
}

impl ContentEncryption {
    pub const ALL: [ContentEncryption; 6] = [
        Self::A128Gcm,
        Self::A192Gcm,
        Self::A256Gcm,
        Self::A128CbcHs256,
        Self::A192CbcHs384,
        Self::A256CbcHs512,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::A128Gcm => "A128GCM",
            Self::A192Gcm => "A192GCM",
            Self::A256Gcm => "A256GCM",
            Self::A128CbcHs256 => "A128CBC-HS256",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A256CbcHs512 => "A256CBC-HS512",
        }
    }

    /// Required key length in bytes. CBC-HS variants carry the MAC key too.
    pub fn key_len(&self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A192Gcm => 24,
            Self::A256Gcm => 32,
            Self::A128CbcHs256 => 32,
            Self::A192CbcHs384 => 48,
            Self::A256CbcHs512 => 64,
        }
    }
}

impl fmt::Display for ContentEncryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContentEncryption {
    type Err = JweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|alg| alg.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| JweError::UnsupportedAlgorithm(s.to_string()))
    }
}

/// Plaintext compression (`zip` header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Deflate,
}

impl Compression {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deflate => "DEF",
        }
    }

    /// Parses an optional compression name; empty means "no compression".
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, JweError> {
        match value.map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => s.parse().map(Some),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Compression {
    type Err = JweError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("DEF") {
            Ok(Self::Deflate)
        } else {
            Err(JweError::UnsupportedCompression(s.to_string()))
        }
    }
}

pub(super) fn check_key_algorithm(alg: &str) -> Result<(), JweError> {
    if alg == KEY_MANAGEMENT_ALGORITHM {
        Ok(())
    } else {
        Err(JweError::UnsupportedKeyAlgorithm(alg.to_string()))
    }
}
