use serde_json::{Value, json};
use tracing::info;

use crate::services::claims::ClaimError;
use crate::services::claims::provider::{ClaimArgs, str_arg};

const DEFAULT_REMAINING_TOKENS: u64 = 10_000;
const QUOTA_RESET_DATE: &str = "2025-06-01";

/// `claims.quota.get_remaining_quota(user_id)`
pub fn get_remaining_quota(args: &ClaimArgs) -> Result<Value, ClaimError> {
    let user_id = str_arg(args, "user_id")?;
    if user_id.is_empty() {
        return Err(ClaimError::InvalidArgument("user_id"));
    }
    info!(user_id, "resolving remaining quota");

    Ok(json!({
        "remaining_tokens": DEFAULT_REMAINING_TOKENS,
        "reset_date": QUOTA_RESET_DATE,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_quota_for_user() {
        let args = json!({ "user_id": "u1" }).as_object().cloned().unwrap();
        let v = get_remaining_quota(&args).unwrap();
        assert_eq!(v["remaining_tokens"], 10_000);
        assert_eq!(v["reset_date"], "2025-06-01");
    }

    #[test]
    fn requires_user_id() {
        let args = json!({ "user_id": "" }).as_object().cloned().unwrap();
        assert!(get_remaining_quota(&args).is_err());
        assert!(get_remaining_quota(&ClaimArgs::new()).is_err());
    }
}
