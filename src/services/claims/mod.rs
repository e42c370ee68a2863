//! Claims resolution: API key configuration records, dynamic claim dispatch,
//! and the engine that merges everything into the claim set of one token.
pub mod dispatcher;
pub mod model;
pub mod placeholder;
pub mod provider;
pub mod providers;
pub mod resolver;

pub use dispatcher::DynamicClaimDispatcher;
pub use model::{ApiKeyConfig, ClaimMap};
pub use provider::ProviderRegistry;
pub use resolver::{ClaimsResolver, ConfigSource};

use thiserror::Error;

/// Why a single dynamic claim could not be resolved.
///
/// Never escapes the dispatcher: a failed claim is logged and omitted.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("no provider registered for {module}.{function}")]
    UnknownProvider { module: String, function: String },

    #[error("invalid dynamic claim spec (type '{kind}'): {reason}")]
    InvalidSpec { kind: String, reason: String },

    #[error("missing or invalid argument '{0}'")]
    InvalidArgument(&'static str),

    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid http method '{0}'")]
    InvalidMethod(String),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("response body is not json: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("response field '{0}' not found")]
    MissingField(String),

    #[error("provider returned no value")]
    EmptyValue,
}
