use serde_json::{Value, json};
use tracing::info;

use crate::services::claims::ClaimError;
use crate::services::claims::provider::{ClaimArgs, str_arg};

/// `claims.access.check_model_access(api_key_id)`
pub fn check_model_access(args: &ClaimArgs) -> Result<Value, ClaimError> {
    let api_key_id = str_arg(args, "api_key_id")?;
    info!(api_key_id, "checking model access");

    let models: &[&str] = match api_key_id {
        "groq-service" => &["llama3-70b", "llama3-8b", "mixtral-8x7b"],
        "openai-service" => &["gpt-3.5-turbo", "gpt-4", "gpt-4-turbo"],
        "full-access" => &["gpt-4", "llama3-70b", "claude-3-opus", "claude-3-sonnet"],
        _ => &["gpt-3.5-turbo"],
    };

    Ok(json!({
        "available_models": models,
        "is_restricted": models.len() < 3,
    }))
}
